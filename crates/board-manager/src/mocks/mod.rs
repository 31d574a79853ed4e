//! Mock drivers for testing
//!
//! Recording init/deinit/power functions that can be dropped into static
//! board tables. Driver functions are plain `fn` pointers and cannot capture
//! state, so every call is appended to a per-thread journal instead; each test
//! thread sees only its own calls.
//!
//! Failure is configured statically: a [`MockConfig`] or [`MockDeviceConfig`]
//! built with `failing_init()` / `failing_deinit()` makes the matching call
//! return an error.

#![cfg(any(test, feature = "std"))]

use std::cell::RefCell;
use std::string::String;
use std::vec::Vec;

use crate::descriptor::{BoardEntry, DeviceImpl, PeripheralImpl};
use crate::device::DeviceContext;
use crate::error::DriverError;
use crate::handle::{Config, Handle};

/// Kind of recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Init function ran successfully.
    Init,
    /// Deinit function ran (successfully or not).
    Deinit,
    /// Power switched on for the named device.
    PowerOn,
    /// Power switched off for the named device.
    PowerOff,
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// What happened.
    pub op: Op,
    /// Config tag for init/deinit, device name for power calls.
    pub name: String,
}

impl Call {
    /// Build an entry, mostly for comparing against [`journal`].
    pub fn new(op: Op, name: &str) -> Self {
        Self {
            op,
            name: name.into(),
        }
    }
}

std::thread_local! {
    static JOURNAL: RefCell<Vec<Call>> = const { RefCell::new(Vec::new()) };
}

fn record(op: Op, name: &str) {
    JOURNAL.with(|journal| journal.borrow_mut().push(Call::new(op, name)));
}

/// Every call recorded on this thread, oldest first.
pub fn journal() -> Vec<Call> {
    JOURNAL.with(|journal| journal.borrow().clone())
}

/// Forget every call recorded on this thread.
pub fn clear_journal() {
    JOURNAL.with(|journal| journal.borrow_mut().clear());
}

/// Number of recorded `op` calls for `name`.
pub fn count(op: Op, name: &str) -> usize {
    JOURNAL.with(|journal| {
        journal
            .borrow()
            .iter()
            .filter(|call| call.op == op && call.name == name)
            .count()
    })
}

/// Configuration understood by the mock peripheral driver.
#[derive(Debug)]
pub struct MockConfig {
    /// Name recorded in the journal.
    pub tag: &'static str,
    /// Init returns [`DriverError::Communication`].
    pub fail_init: bool,
    /// Deinit returns [`DriverError::Timeout`].
    pub fail_deinit: bool,
}

impl MockConfig {
    /// A peripheral that always works.
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag,
            fail_init: false,
            fail_deinit: false,
        }
    }

    /// Make init fail.
    #[must_use]
    pub const fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make deinit fail.
    #[must_use]
    pub const fn failing_deinit(mut self) -> Self {
        self.fail_deinit = true;
        self
    }
}

/// Handle produced by the mock peripheral driver.
#[derive(Debug)]
pub struct MockPeripheral {
    /// Tag of the config it was built from.
    pub tag: &'static str,
    fail_deinit: bool,
}

/// Mock peripheral implementation for `(kind, role)`.
pub const fn peripheral_impl(kind: &'static str, role: &'static str) -> PeripheralImpl {
    PeripheralImpl {
        kind,
        role,
        init: peripheral_init,
        deinit: peripheral_deinit,
    }
}

fn peripheral_init(config: Config) -> Result<Handle, DriverError> {
    let config = config.get::<MockConfig>()?;
    if config.fail_init {
        return Err(DriverError::Communication);
    }
    record(Op::Init, config.tag);
    Ok(Handle::new(MockPeripheral {
        tag: config.tag,
        fail_deinit: config.fail_deinit,
    }))
}

fn peripheral_deinit(handle: Handle) -> Result<(), DriverError> {
    let periph = handle
        .into_inner::<MockPeripheral>()
        .map_err(|_| DriverError::InvalidConfig)?;
    record(Op::Deinit, periph.tag);
    if periph.fail_deinit {
        return Err(DriverError::Timeout);
    }
    Ok(())
}

/// Configuration understood by the mock device driver.
#[derive(Debug)]
pub struct MockDeviceConfig {
    /// Name recorded in the journal.
    pub tag: &'static str,
    /// Peripherals acquired at init and released at deinit.
    pub peripherals: &'static [&'static str],
    /// Init returns [`DriverError::Communication`].
    pub fail_init: bool,
    /// Deinit returns [`DriverError::Timeout`].
    pub fail_deinit: bool,
}

impl MockDeviceConfig {
    /// A device that always works.
    pub const fn new(tag: &'static str, peripherals: &'static [&'static str]) -> Self {
        Self {
            tag,
            peripherals,
            fail_init: false,
            fail_deinit: false,
        }
    }

    /// Make init fail before any peripheral is touched.
    #[must_use]
    pub const fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make deinit fail after the peripherals are released.
    #[must_use]
    pub const fn failing_deinit(mut self) -> Self {
        self.fail_deinit = true;
        self
    }
}

/// Handle produced by the mock device driver.
#[derive(Debug)]
pub struct MockDevice {
    /// Tag of the config it was built from.
    pub tag: &'static str,
    /// Devices this one has switched on through [`power_ctrl`] and not off.
    pub powered: Vec<String>,
}

/// Mock device implementation for `kind`.
pub const fn device_impl(kind: &'static str) -> DeviceImpl {
    DeviceImpl {
        kind,
        init: device_init,
        deinit: device_deinit,
    }
}

/// Device implementation that hands off to the board entry named by the
/// descriptor's `sub_type`.
pub const fn dispatching_device_impl(kind: &'static str) -> DeviceImpl {
    DeviceImpl {
        kind,
        init: dispatch_init,
        deinit: dispatch_deinit,
    }
}

/// Board entry backed by the mock device driver.
pub const fn board_entry(name: &'static str) -> BoardEntry {
    BoardEntry {
        name,
        init: device_init,
        deinit: device_deinit,
    }
}

fn dispatch_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let sub_type = ctx.sub_type();
    ctx.init_entry(sub_type)
}

fn dispatch_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let sub_type = ctx.sub_type();
    ctx.deinit_entry(sub_type, handle)
}

fn device_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let config = ctx.config().get::<MockDeviceConfig>()?;
    if config.fail_init {
        return Err(DriverError::Communication);
    }
    for (acquired, name) in config.peripherals.iter().enumerate() {
        if let Err(err) = ctx.peripherals().init(name) {
            for held in config.peripherals.iter().take(acquired).rev() {
                if let Err(release) = ctx.peripherals().deinit(held) {
                    warn!(
                        "mock device '{}': release of '{}' failed: {}",
                        config.tag,
                        held,
                        release
                    );
                }
            }
            return Err(err.into());
        }
    }
    record(Op::Init, config.tag);
    Ok(Handle::new(MockDevice {
        tag: config.tag,
        powered: Vec::new(),
    }))
}

fn device_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let config = ctx.config().get::<MockDeviceConfig>()?;
    let device = handle
        .into_inner::<MockDevice>()
        .map_err(|_| DriverError::InvalidConfig)?;
    for name in config.peripherals.iter().rev() {
        ctx.peripherals().deinit(name)?;
    }
    record(Op::Deinit, device.tag);
    if config.fail_deinit {
        return Err(DriverError::Timeout);
    }
    Ok(())
}

/// Mock power-control function; register it as `"<sub_type>_power_ctrl"`.
///
/// The power device must be a [`MockDevice`].
pub fn power_ctrl(handle: &mut Handle, device: &str, on: bool) -> Result<(), DriverError> {
    let switch = handle
        .downcast_mut::<MockDevice>()
        .ok_or(DriverError::InvalidConfig)?;
    if on {
        if !switch.powered.iter().any(|name| name == device) {
            switch.powered.push(device.into());
        }
        record(Op::PowerOn, device);
    } else {
        switch.powered.retain(|name| name != device);
        record(Op::PowerOff, device);
    }
    Ok(())
}

/// Mock power-control function that always fails with [`DriverError::Busy`].
pub fn failing_power_ctrl(_handle: &mut Handle, _device: &str, _on: bool) -> Result<(), DriverError> {
    Err(DriverError::Busy)
}
