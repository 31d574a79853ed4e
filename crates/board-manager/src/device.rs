//! Device registry.
//!
//! Devices (codecs, amplifiers, displays, ...) sit on top of peripherals. A
//! device implementation acquires the peripherals it needs through the
//! [`DeviceContext`] it is handed, and may delegate to a chip-specific
//! [`BoardEntry`] picked by the descriptor's `sub_type`.
//!
//! A device with `power_ctrl` set is powered through another device: the first
//! activation takes one reference on the power device before calling init, and
//! the final release drops it again after deinit. Power references are always
//! balanced against the device's own activation.

use crate::descriptor::{find_device_impl, BoardDef, BoardEntry, DeviceDesc, DeviceImpl};
use crate::error::{DriverError, Error};
use crate::extra_fn::{power_ctrl_name, ExtraFnEntry, ExtraFnTable};
use crate::handle::{Config, Handle, HandleId};
use crate::instance::{BulkReport, InstanceTable, Release};
use crate::peripheral::PeripheralRegistry;
use crate::status::ResourceStatus;

/// Device bring-up.
pub type DeviceInitFn = fn(&mut DeviceContext<'_>) -> Result<Handle, DriverError>;

/// Device teardown: consumes the handle returned by [`DeviceInitFn`].
pub type DeviceDeinitFn = fn(Handle, &mut DeviceContext<'_>) -> Result<(), DriverError>;

/// What a device driver sees while it runs.
pub struct DeviceContext<'a> {
    desc: &'static DeviceDesc,
    peripherals: &'a mut PeripheralRegistry,
    entries: &'static [BoardEntry],
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn new(
        desc: &'static DeviceDesc,
        peripherals: &'a mut PeripheralRegistry,
        entries: &'static [BoardEntry],
    ) -> Self {
        Self {
            desc,
            peripherals,
            entries,
        }
    }

    /// Device name.
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    /// Device kind.
    pub fn kind(&self) -> &'static str {
        self.desc.kind
    }

    /// Sub-driver name.
    pub fn sub_type(&self) -> &'static str {
        self.desc.sub_type
    }

    /// Static configuration of the device.
    pub fn config(&self) -> Config {
        self.desc.config
    }

    /// Peripherals of the board, for `ref_handle` / `unref_handle`.
    pub fn peripherals(&mut self) -> &mut PeripheralRegistry {
        self.peripherals
    }

    /// Run the init of the board entry named `name`.
    ///
    /// A missing entry is reported as [`DriverError::Unsupported`].
    pub fn init_entry(&mut self, name: &str) -> Result<Handle, DriverError> {
        let entry = self.entry(name)?;
        (entry.init)(self)
    }

    /// Run the deinit of the board entry named `name`.
    pub fn deinit_entry(&mut self, name: &str, handle: Handle) -> Result<(), DriverError> {
        let entry = self.entry(name)?;
        (entry.deinit)(handle, self)
    }

    fn entry(&self, name: &str) -> Result<&'static BoardEntry, DriverError> {
        let entries: &'static [BoardEntry] = self.entries;
        entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| {
                warn!("device '{}': no board entry '{}'", self.desc.name, name);
                DriverError::Unsupported
            })
    }
}

/// Per-device bookkeeping next to the reference count.
#[derive(Debug, Default)]
struct DeviceState {
    /// This activation took a reference on the power device.
    holds_power: bool,
    /// Init is in progress; used to detect `power_ctrl` cycles.
    initializing: bool,
}

/// Reference-counted registry of a board's devices.
pub struct DeviceRegistry {
    table: InstanceTable<DeviceDesc, DeviceImpl, DeviceState>,
    entries: &'static [BoardEntry],
    extra_fns: ExtraFnTable,
}

impl DeviceRegistry {
    /// Registry over the device tables of `board`.
    pub fn new(board: &BoardDef) -> Self {
        Self::from_tables(
            board.devices,
            board.device_impls,
            board.entries,
            board.extra_fns,
        )
    }

    /// Registry over explicit tables.
    ///
    /// Devices whose kind has no implementation get no handle slot and can
    /// never be activated.
    pub fn from_tables(
        devices: &'static [DeviceDesc],
        impls: &'static [DeviceImpl],
        entries: &'static [BoardEntry],
        extra_fns: &'static [ExtraFnEntry],
    ) -> Self {
        Self {
            table: InstanceTable::new(devices, |desc| find_device_impl(impls, desc.kind)),
            entries,
            extra_fns: ExtraFnTable::new(extra_fns),
        }
    }

    /// Acquire `name`, initializing it on the first reference.
    ///
    /// On first activation the `power_ctrl` device, if any, is acquired first.
    /// That step is best effort: if it fails the device init still runs.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] - no device with that name
    /// - [`Error::NoHandleSlot`] - nothing registered for its kind
    /// - [`Error::InvalidArgument`] - the `power_ctrl` chain loops back here
    /// - [`Error::InitFailed`] - the init function failed; ref_count stays 0
    pub fn init(&mut self, name: &str, periphs: &mut PeripheralRegistry) -> Result<(), Error> {
        let index = self.table.index(name)?;
        let slot = self.table.slot(index).ok_or(Error::NotFound)?;
        let desc = slot.desc;
        let Some(imp) = slot.imp else {
            warn!("device '{}': no handle slot for kind {}", desc.name, desc.kind);
            return Err(Error::NoHandleSlot);
        };

        if slot.is_active() {
            let count = self.table.retain(index)?;
            debug!("device '{}' referenced, ref_count={}", desc.name, count);
            return Ok(());
        }
        if slot.ext.initializing {
            warn!("device '{}': power_ctrl chain loops back to itself", desc.name);
            return Err(Error::InvalidArgument);
        }

        self.set_state(index, |state| state.initializing = true);
        let holds_power = match desc.power_ctrl {
            Some(power) => match self.init(power, periphs) {
                Ok(()) => true,
                Err(err) => {
                    warn!(
                        "device '{}': power device '{}' unavailable: {}",
                        desc.name,
                        power,
                        err
                    );
                    false
                }
            },
            None => false,
        };
        self.set_state(index, |state| state.initializing = false);

        let mut ctx = DeviceContext::new(desc, periphs, self.entries);
        match (imp.init)(&mut ctx) {
            Ok(handle) => {
                self.table.activate(index, handle)?;
                self.set_state(index, |state| state.holds_power = holds_power);
                info!("device '{}' initialized ({}/{})", desc.name, desc.kind, desc.sub_type);
                Ok(())
            }
            Err(err) => {
                error!("device '{}' init failed: {}", desc.name, err);
                if holds_power {
                    self.release_power(desc, periphs);
                }
                Err(Error::InitFailed(err))
            }
        }
    }

    /// Release one reference, tearing the device down on the last one.
    ///
    /// Releasing an inactive device is a no-op. On the last release the power
    /// reference taken at activation is dropped even if deinit failed.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] - no device with that name
    /// - [`Error::DeinitFailed`] - the deinit function failed
    pub fn deinit(&mut self, name: &str, periphs: &mut PeripheralRegistry) -> Result<(), Error> {
        let index = self.table.index(name)?;
        let slot = self.table.slot(index).ok_or(Error::NotFound)?;
        let (desc, imp) = (slot.desc, slot.imp);

        let handle = match self.table.release(index)? {
            Release::Inactive => {
                debug!("device '{}' not active, nothing to release", desc.name);
                return Ok(());
            }
            Release::StillReferenced(count) => {
                debug!("device '{}' still referenced, ref_count={}", desc.name, count);
                return Ok(());
            }
            Release::Last(handle) => handle,
        };

        let result = match imp {
            Some(imp) => {
                let mut ctx = DeviceContext::new(desc, periphs, self.entries);
                (imp.deinit)(handle, &mut ctx).map_err(|err| {
                    error!("device '{}' deinit failed: {}", desc.name, err);
                    Error::DeinitFailed(err)
                })
            }
            None => Ok(()),
        };
        if result.is_ok() {
            info!("device '{}' deinitialized", desc.name);
        }

        let holds_power = self
            .table
            .slot_mut(index)
            .is_some_and(|slot| core::mem::take(&mut slot.ext.holds_power));
        if holds_power {
            self.release_power(desc, periphs);
        }
        result
    }

    fn release_power(&mut self, desc: &'static DeviceDesc, periphs: &mut PeripheralRegistry) {
        let Some(power) = desc.power_ctrl else {
            return;
        };
        if let Err(err) = self.deinit(power, periphs) {
            warn!(
                "device '{}': releasing power device '{}' failed: {}",
                desc.name,
                power,
                err
            );
        }
    }

    fn set_state(&mut self, index: usize, update: impl FnOnce(&mut DeviceState)) {
        if let Some(slot) = self.table.slot_mut(index) {
            update(&mut slot.ext);
        }
    }

    /// Switch `name`'s power on or off through its `power_ctrl` device.
    ///
    /// The power device is initialized on demand if it is not active yet; that
    /// reference is held until the power device is torn down.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] - unknown device or power device
    /// - [`Error::NoPowerCtrl`] - the device has no `power_ctrl`
    /// - [`Error::InvalidArgument`] - the power device has no usable `sub_type`
    /// - [`Error::NoImplementation`] - no `"<sub_type>_power_ctrl"` function
    /// - [`Error::PowerCtrlFailed`] - the power function failed
    pub fn power_ctrl(
        &mut self,
        name: &str,
        on: bool,
        periphs: &mut PeripheralRegistry,
    ) -> Result<(), Error> {
        let desc = self.desc(name)?;
        let Some(power) = desc.power_ctrl else {
            debug!("device '{}' has no power_ctrl", desc.name);
            return Err(Error::NoPowerCtrl);
        };
        let power_index = self.table.index(power)?;
        let power_desc = self.desc(power)?;

        let fn_name = power_ctrl_name(power_desc.sub_type)?;
        let Some(func) = self.extra_fns.power_ctrl(&fn_name) else {
            warn!("device '{}': no extra function '{}'", desc.name, fn_name.as_str());
            return Err(Error::NoImplementation);
        };

        if !self.is_active(power) {
            self.init(power, periphs)?;
        }
        let handle = self
            .table
            .slot_mut(power_index)
            .and_then(|slot| slot.handle_mut())
            .ok_or(Error::NotActive)?;

        func(handle, desc.name, on).map_err(|err| {
            error!("device '{}' power control failed: {}", desc.name, err);
            Error::PowerCtrlFailed(err)
        })?;
        info!(
            "device '{}' power {} via '{}'",
            desc.name,
            if on { "on" } else { "off" },
            power
        );
        Ok(())
    }

    /// Borrow the handle of an active device without taking a reference.
    pub fn handle(&self, name: &str) -> Result<&Handle, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot(index)
            .and_then(|slot| slot.handle())
            .ok_or(Error::NotActive)
    }

    /// Mutably borrow the handle of an active device.
    pub fn handle_mut(&mut self, name: &str) -> Result<&mut Handle, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot_mut(index)
            .and_then(|slot| slot.handle_mut())
            .ok_or(Error::NotActive)
    }

    /// Descriptor of `name`.
    pub fn desc(&self, name: &str) -> Result<&'static DeviceDesc, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot(index)
            .map(|slot| slot.desc)
            .ok_or(Error::NotFound)
    }

    /// Static configuration of `name`, active or not.
    pub fn config(&self, name: &str) -> Result<Config, Error> {
        self.desc(name).map(|desc| desc.config)
    }

    /// Current reference count of `name`.
    pub fn ref_count(&self, name: &str) -> Result<u32, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot(index)
            .map(|slot| slot.ref_count())
            .ok_or(Error::NotFound)
    }

    /// `true` if `name` exists and is initialized.
    pub fn is_active(&self, name: &str) -> bool {
        self.ref_count(name).is_ok_and(|count| count > 0)
    }

    /// Name of the device owning handle `id`.
    pub fn name_by_handle(&self, id: HandleId) -> Result<&'static str, Error> {
        self.desc_by_handle(id).map(|desc| desc.name)
    }

    /// Static configuration of the device owning handle `id`.
    pub fn config_by_handle(&self, id: HandleId) -> Result<Config, Error> {
        self.desc_by_handle(id).map(|desc| desc.config)
    }

    fn desc_by_handle(&self, id: HandleId) -> Result<&'static DeviceDesc, Error> {
        self.table
            .index_of_handle(id)
            .and_then(|index| self.table.slot(index))
            .map(|slot| slot.desc)
            .ok_or(Error::NotFound)
    }

    /// Initialize every device not marked `init_skip`, in declared order.
    ///
    /// Best effort: a failure is logged and the walk continues.
    pub fn init_all(&mut self, periphs: &mut PeripheralRegistry) -> BulkReport {
        let mut report = BulkReport::default();
        for index in 0..self.table.len() {
            let Some(desc) = self.table.slot(index).map(|slot| slot.desc) else {
                continue;
            };
            if desc.init_skip {
                debug!("init_all: device '{}' marked init_skip", desc.name);
                report.skip();
                continue;
            }
            let result = self.init(desc.name, periphs);
            if let Err(err) = result {
                warn!("init_all: device '{}' skipped: {}", desc.name, err);
            }
            report.record(result);
        }
        report
    }

    /// Tear down every active device in reverse declared order.
    ///
    /// Each device is released until inactive, whatever its reference count.
    /// Best effort: a failure is logged and the walk continues.
    pub fn deinit_all(&mut self, periphs: &mut PeripheralRegistry) -> BulkReport {
        let mut report = BulkReport::default();
        for index in (0..self.table.len()).rev() {
            let Some((name, count)) = self
                .table
                .slot(index)
                .map(|slot| (slot.desc.name, slot.ref_count()))
            else {
                continue;
            };
            if count == 0 {
                report.skip();
                continue;
            }
            let mut result = Ok(());
            for _ in 0..count {
                if let Err(err) = self.deinit(name, periphs) {
                    warn!("deinit_all: device '{}': {}", name, err);
                    result = Err(err);
                }
                if !self.is_active(name) {
                    break;
                }
            }
            report.record(result);
        }
        report
    }

    /// Number of catalogued devices with a handle slot or not.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` if the board has no devices.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Snapshot of every device in declared order.
    pub fn statuses(&self) -> impl Iterator<Item = ResourceStatus> + '_ {
        self.table.iter().map(|slot| ResourceStatus {
            name: slot.desc.name,
            kind: slot.desc.kind,
            role: slot.desc.sub_type,
            ref_count: slot.ref_count(),
            handle: slot.handle().map(Handle::id),
            implemented: slot.imp.is_some(),
            init_skip: slot.desc.init_skip,
            power_ctrl: slot.desc.power_ctrl,
        })
    }
}
