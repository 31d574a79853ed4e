//! Named auxiliary functions.
//!
//! Functions that are not part of a resource's init/deinit pair but are still
//! looked up by a name derived from configuration. The only convention the
//! registries rely on is power control: the device whose `sub_type` is `gpio`
//! exposes `gpio_power_ctrl`.
//!
//! Every entry carries its signature in [`ExtraFn`], so a lookup can never hand
//! back a function of the wrong shape.

use crate::error::{DriverError, Error};
use crate::handle::Handle;

/// Suffix appended to a power device's `sub_type` to name its power function.
pub const POWER_CTRL_SUFFIX: &str = "_power_ctrl";

/// Longest extra-function name [`power_ctrl_name`] can build.
pub const MAX_EXTRA_FN_NAME: usize = 48;

/// Switch power for `device` on or off through the power device's handle.
pub type PowerCtrlFn = fn(&mut Handle, &str, bool) -> Result<(), DriverError>;

/// An auxiliary function together with its signature.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum ExtraFn {
    /// `(power_device_handle, device_name, on)`
    PowerCtrl(PowerCtrlFn),
}

/// One row of the extra-function table.
#[derive(Debug, Clone, Copy)]
pub struct ExtraFnEntry {
    /// Lookup key, matched exactly.
    pub name: &'static str,
    /// The function.
    pub func: ExtraFn,
}

impl ExtraFnEntry {
    /// A power-control entry.
    pub const fn power_ctrl(name: &'static str, func: PowerCtrlFn) -> Self {
        Self {
            name,
            func: ExtraFn::PowerCtrl(func),
        }
    }
}

/// Name-keyed lookup over a static extra-function table.
///
/// Absence is an ordinary outcome; the table never logs it.
#[derive(Debug, Clone, Copy)]
pub struct ExtraFnTable {
    entries: &'static [ExtraFnEntry],
}

impl ExtraFnTable {
    /// Wrap a static table.
    pub const fn new(entries: &'static [ExtraFnEntry]) -> Self {
        Self { entries }
    }

    /// First entry registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<ExtraFn> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.func)
    }

    /// Power-control function registered under `name`.
    pub fn power_ctrl(&self, name: &str) -> Option<PowerCtrlFn> {
        match self.lookup(name)? {
            ExtraFn::PowerCtrl(func) => Some(func),
        }
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build `"<sub_type>_power_ctrl"`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `sub_type` is empty or the name would not fit
/// in [`MAX_EXTRA_FN_NAME`] bytes.
pub fn power_ctrl_name(sub_type: &str) -> Result<heapless::String<MAX_EXTRA_FN_NAME>, Error> {
    if sub_type.is_empty() {
        return Err(Error::InvalidArgument);
    }
    let mut name = heapless::String::new();
    name.push_str(sub_type)
        .map_err(|_| Error::InvalidArgument)?;
    name.push_str(POWER_CTRL_SUFFIX)
        .map_err(|_| Error::InvalidArgument)?;
    Ok(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gpio_power(_handle: &mut Handle, _device: &str, _on: bool) -> Result<(), DriverError> {
        Ok(())
    }

    fn failing_power(_handle: &mut Handle, _device: &str, _on: bool) -> Result<(), DriverError> {
        Err(DriverError::Timeout)
    }

    static TABLE: [ExtraFnEntry; 2] = [
        ExtraFnEntry::power_ctrl("gpio_power_ctrl", gpio_power),
        ExtraFnEntry::power_ctrl("gpio_power_ctrl", failing_power),
    ];

    #[test]
    fn lookup_finds_first_match() {
        let table = ExtraFnTable::new(&TABLE);
        let func = table.power_ctrl("gpio_power_ctrl").unwrap();
        let mut handle = Handle::new(());
        assert_eq!(func(&mut handle, "audio_dac", true), Ok(()));
    }

    #[test]
    fn missing_entry_is_none() {
        let table = ExtraFnTable::new(&TABLE);
        assert!(table.lookup("i2c_power_ctrl").is_none());
        assert!(table.power_ctrl("GPIO_POWER_CTRL").is_none(), "lookup is case-sensitive");
    }

    #[test]
    fn power_ctrl_name_appends_suffix() {
        assert_eq!(power_ctrl_name("gpio").unwrap().as_str(), "gpio_power_ctrl");
    }

    #[test]
    fn power_ctrl_name_rejects_empty_and_oversized() {
        assert_eq!(power_ctrl_name(""), Err(Error::InvalidArgument));
        let long = "x".repeat(MAX_EXTRA_FN_NAME);
        assert_eq!(power_ctrl_name(&long), Err(Error::InvalidArgument));
    }
}
