//! Static board description.
//!
//! Every table here is meant to live in a `static`: descriptors name the
//! resources a board has, implementation records say how to bring a kind of
//! resource up. A descriptor is usable only once a matching implementation
//! exists.
//!
//! ```text
//! PeripheralDesc ──(kind, role)──> PeripheralImpl
//! DeviceDesc     ──kind─────────> DeviceImpl ──sub_type──> BoardEntry
//! DeviceDesc.power_ctrl ──name──> DeviceDesc ──"<sub_type>_power_ctrl"──> ExtraFnEntry
//! ```

use crate::device::{DeviceDeinitFn, DeviceInitFn};
use crate::extra_fn::ExtraFnEntry;
use crate::handle::Config;
use crate::peripheral::{PeriphDeinitFn, PeriphInitFn};

/// A named peripheral (bus or controller).
#[derive(Debug, Clone, Copy)]
pub struct PeripheralDesc {
    /// Unique peripheral name, e.g. `"i2c_master"`.
    pub name: &'static str,
    /// Category, e.g. `"i2c"`.
    pub kind: &'static str,
    /// Role within the category, e.g. `"master"`, `"tx"`.
    pub role: &'static str,
    /// Static configuration.
    pub config: Config,
}

impl PeripheralDesc {
    /// Describe a peripheral.
    pub const fn new(
        name: &'static str,
        kind: &'static str,
        role: &'static str,
        config: Config,
    ) -> Self {
        Self {
            name,
            kind,
            role,
            config,
        }
    }
}

/// A named device built on top of peripherals.
#[derive(Debug, Clone, Copy)]
pub struct DeviceDesc {
    /// Unique device name, e.g. `"audio_dac"`.
    pub name: &'static str,
    /// Category, e.g. `"audio_codec"`. Selects the [`DeviceImpl`].
    pub kind: &'static str,
    /// Sub-driver name, e.g. `"es9038q2m"` or `"gpio"`.
    pub sub_type: &'static str,
    /// Static configuration.
    pub config: Config,
    /// Device that must be powered before this one initializes.
    pub power_ctrl: Option<&'static str>,
    /// Excluded from bulk initialization.
    pub init_skip: bool,
}

impl DeviceDesc {
    /// Describe a device with no power dependency.
    pub const fn new(
        name: &'static str,
        kind: &'static str,
        sub_type: &'static str,
        config: Config,
    ) -> Self {
        Self {
            name,
            kind,
            sub_type,
            config,
            power_ctrl: None,
            init_skip: false,
        }
    }

    /// Power this device through the device named `power_ctrl`.
    #[must_use]
    pub const fn with_power_ctrl(mut self, power_ctrl: &'static str) -> Self {
        self.power_ctrl = Some(power_ctrl);
        self
    }

    /// Leave this device out of bulk initialization.
    #[must_use]
    pub const fn skip_init(mut self) -> Self {
        self.init_skip = true;
        self
    }
}

/// Init/deinit pair for one `(kind, role)` of peripheral.
#[derive(Debug, Clone, Copy)]
pub struct PeripheralImpl {
    /// Peripheral category this implementation serves.
    pub kind: &'static str,
    /// Role this implementation serves.
    pub role: &'static str,
    /// Bring-up.
    pub init: PeriphInitFn,
    /// Teardown.
    pub deinit: PeriphDeinitFn,
}

/// Init/deinit pair for one kind of device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceImpl {
    /// Device category this implementation serves.
    pub kind: &'static str,
    /// Bring-up.
    pub init: DeviceInitFn,
    /// Teardown.
    pub deinit: DeviceDeinitFn,
}

/// Named sub-driver a device implementation can delegate to.
///
/// Lets one device kind (say `"audio_codec"`) pick the chip-specific driver
/// from its descriptor's `sub_type` string.
#[derive(Debug, Clone, Copy)]
pub struct BoardEntry {
    /// Entry name, matched exactly.
    pub name: &'static str,
    /// Bring-up.
    pub init: DeviceInitFn,
    /// Teardown.
    pub deinit: DeviceDeinitFn,
}

/// Identification of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoardInfo {
    /// Board name.
    pub name: &'static str,
    /// Target chip.
    pub chip: &'static str,
    /// Hardware revision.
    pub version: &'static str,
    /// Board vendor.
    pub manufacturer: &'static str,
    /// Free-form description.
    pub description: &'static str,
}

/// Everything the board manager knows about one board.
///
/// Peripheral and device order is the declared board order: bulk init walks
/// it forwards, bulk deinit backwards.
#[derive(Debug, Clone, Copy)]
pub struct BoardDef {
    /// Identification.
    pub info: BoardInfo,
    /// Peripheral catalogue.
    pub peripherals: &'static [PeripheralDesc],
    /// Peripheral implementations.
    pub peripheral_impls: &'static [PeripheralImpl],
    /// Device catalogue.
    pub devices: &'static [DeviceDesc],
    /// Device implementations.
    pub device_impls: &'static [DeviceImpl],
    /// Named sub-drivers.
    pub entries: &'static [BoardEntry],
    /// Named auxiliary functions.
    pub extra_fns: &'static [ExtraFnEntry],
}

/// Implementation for a peripheral `(kind, role)`, first match wins.
pub(crate) fn find_peripheral_impl(
    impls: &'static [PeripheralImpl],
    kind: &str,
    role: &str,
) -> Option<&'static PeripheralImpl> {
    impls
        .iter()
        .find(|imp| imp.kind == kind && imp.role == role)
}

/// Implementation for a device kind, first match wins.
pub(crate) fn find_device_impl(
    impls: &'static [DeviceImpl],
    kind: &str,
) -> Option<&'static DeviceImpl> {
    impls.iter().find(|imp| imp.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    static CODEC_CONFIG: u8 = 0x48;

    static DESC: DeviceDesc = DeviceDesc::new(
        "audio_dac",
        "audio_codec",
        "es9038q2m",
        Config::new(&CODEC_CONFIG),
    )
    .with_power_ctrl("power_amp")
    .skip_init();

    #[test]
    fn device_builders_set_flags() {
        assert_eq!(DESC.power_ctrl, Some("power_amp"));
        assert!(DESC.init_skip);
        assert_eq!(DESC.config.get::<u8>(), Ok(&0x48));
    }

    static IMPLS: [DeviceImpl; 0] = [];

    #[test]
    fn device_impl_lookup_on_empty_table() {
        assert!(find_device_impl(&IMPLS, "audio_codec").is_none());
    }

    #[test]
    fn plain_device_has_no_power_ctrl() {
        let desc = DeviceDesc::new("led", "gpio_ctrl", "", Config::NONE);
        assert_eq!(desc.power_ctrl, None);
        assert!(!desc.init_skip);
    }
}
