//! Peripheral registry.
//!
//! Buses and controllers (I2C, SPI, I2S, GPIO, ...) looked up by name and
//! brought up through the implementation registered for their `(kind, role)`.
//!
//! Per peripheral: `Uninitialized → Active(ref_count ≥ 1) → Uninitialized`.
//! Only the 0 → 1 transition calls the init function and only 1 → 0 calls
//! deinit; everything in between just moves the counter.

use crate::descriptor::{find_peripheral_impl, BoardDef, PeripheralDesc, PeripheralImpl};
use crate::error::{DriverError, Error};
use crate::handle::{Config, Handle, HandleId};
use crate::instance::{BulkReport, InstanceTable, Release};
use crate::status::ResourceStatus;

/// Peripheral bring-up: static configuration in, owned handle out.
pub type PeriphInitFn = fn(Config) -> Result<Handle, DriverError>;

/// Peripheral teardown: consumes the handle returned by [`PeriphInitFn`].
pub type PeriphDeinitFn = fn(Handle) -> Result<(), DriverError>;

/// Reference-counted registry of a board's peripherals.
pub struct PeripheralRegistry {
    table: InstanceTable<PeripheralDesc, PeripheralImpl, ()>,
}

impl PeripheralRegistry {
    /// Registry over the peripheral tables of `board`.
    pub fn new(board: &BoardDef) -> Self {
        Self::from_tables(board.peripherals, board.peripheral_impls)
    }

    /// Registry over explicit descriptor and implementation tables.
    pub fn from_tables(
        peripherals: &'static [PeripheralDesc],
        impls: &'static [PeripheralImpl],
    ) -> Self {
        Self {
            table: InstanceTable::new(peripherals, |desc| {
                find_peripheral_impl(impls, desc.kind, desc.role)
            }),
        }
    }

    /// Acquire `name`, initializing it on the first reference.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] - no peripheral with that name
    /// - [`Error::NoImplementation`] - nothing registered for its `(kind, role)`
    /// - [`Error::InitFailed`] - the init function failed; ref_count stays 0
    pub fn init(&mut self, name: &str) -> Result<(), Error> {
        let index = self.table.index(name)?;
        let slot = self.table.slot(index).ok_or(Error::NotFound)?;
        let desc = slot.desc;
        let Some(imp) = slot.imp else {
            warn!(
                "peripheral '{}': no implementation for {}/{}",
                desc.name,
                desc.kind,
                desc.role
            );
            return Err(Error::NoImplementation);
        };

        if slot.is_active() {
            let count = self.table.retain(index)?;
            debug!("peripheral '{}' referenced, ref_count={}", desc.name, count);
            return Ok(());
        }

        let handle = (imp.init)(desc.config).map_err(|err| {
            error!("peripheral '{}' init failed: {}", desc.name, err);
            Error::InitFailed(err)
        })?;
        self.table.activate(index, handle)?;
        info!(
            "peripheral '{}' initialized ({}/{})",
            desc.name,
            desc.kind,
            desc.role
        );
        Ok(())
    }

    /// Acquire `name` and borrow its handle.
    ///
    /// Every successful call must be balanced by [`unref_handle`](Self::unref_handle).
    pub fn ref_handle(&mut self, name: &str) -> Result<&Handle, Error> {
        self.init(name)?;
        self.handle(name)
    }

    /// Release one reference; alias of [`deinit`](Self::deinit).
    pub fn unref_handle(&mut self, name: &str) -> Result<(), Error> {
        self.deinit(name)
    }

    /// Release one reference, tearing the peripheral down on the last one.
    ///
    /// Releasing an inactive peripheral is a no-op. A failing deinit function
    /// still leaves the peripheral inactive.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] - no peripheral with that name
    /// - [`Error::DeinitFailed`] - the deinit function failed
    pub fn deinit(&mut self, name: &str) -> Result<(), Error> {
        let index = self.table.index(name)?;
        let slot = self.table.slot(index).ok_or(Error::NotFound)?;
        let (desc, imp) = (slot.desc, slot.imp);

        match self.table.release(index)? {
            Release::Inactive => {
                debug!("peripheral '{}' not active, nothing to release", desc.name);
                Ok(())
            }
            Release::StillReferenced(count) => {
                debug!("peripheral '{}' still referenced, ref_count={}", desc.name, count);
                Ok(())
            }
            Release::Last(handle) => {
                if let Some(imp) = imp {
                    (imp.deinit)(handle).map_err(|err| {
                        error!("peripheral '{}' deinit failed: {}", desc.name, err);
                        Error::DeinitFailed(err)
                    })?;
                }
                info!("peripheral '{}' deinitialized", desc.name);
                Ok(())
            }
        }
    }

    /// Borrow the handle of an active peripheral without taking a reference.
    pub fn handle(&self, name: &str) -> Result<&Handle, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot(index)
            .and_then(|slot| slot.handle())
            .ok_or(Error::NotActive)
    }

    /// Mutably borrow the handle of an active peripheral.
    pub fn handle_mut(&mut self, name: &str) -> Result<&mut Handle, Error> {
        let index = self.table.index(name)?;
        self.table
            .slot_mut(index)
            .and_then(|slot| slot.handle_mut())
            .ok_or(Error::NotActive)
    }

    /// Descriptor of `name`.
    pub fn desc(&self, name: &str) -> Result<&'static PeripheralDesc, Error> {
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

    /// Name of the peripheral owning handle `id`.
    pub fn name_by_handle(&self, id: HandleId) -> Result<&'static str, Error> {
        self.desc_by_handle(id).map(|desc| desc.name)
    }

    /// Static configuration of the peripheral owning handle `id`.
    pub fn config_by_handle(&self, id: HandleId) -> Result<Config, Error> {
        self.desc_by_handle(id).map(|desc| desc.config)
    }

    fn desc_by_handle(&self, id: HandleId) -> Result<&'static PeripheralDesc, Error> {
        self.table
            .index_of_handle(id)
            .and_then(|index| self.table.slot(index))
            .map(|slot| slot.desc)
            .ok_or(Error::NotFound)
    }

    /// Initialize every peripheral in declared order.
    ///
    /// Best effort: a failure is logged and the walk continues.
    pub fn init_all(&mut self) -> BulkReport {
        let mut report = BulkReport::default();
        for index in 0..self.table.len() {
            let Some(name) = self.table.slot(index).map(|slot| slot.desc.name) else {
                continue;
            };
            let result = self.init(name);
            if let Err(err) = result {
                warn!("init_all: peripheral '{}' skipped: {}", name, err);
            }
            report.record(result);
        }
        report
    }

    /// Release one reference of every active peripheral, in reverse declared order.
    ///
    /// Best effort: a failure is logged and the walk continues.
    pub fn deinit_all(&mut self) -> BulkReport {
        let mut report = BulkReport::default();
        for index in (0..self.table.len()).rev() {
            let Some((name, active)) = self
                .table
                .slot(index)
                .map(|slot| (slot.desc.name, slot.is_active()))
            else {
                continue;
            };
            if !active {
                report.skip();
                continue;
            }
            let result = self.deinit(name);
            if let Err(err) = result {
                warn!("deinit_all: peripheral '{}': {}", name, err);
            }
            report.record(result);
        }
        report
    }

    /// Number of catalogued peripherals.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` if the board has no peripherals.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Snapshot of every peripheral in declared order.
    pub fn statuses(&self) -> impl Iterator<Item = ResourceStatus> + '_ {
        self.table.iter().map(|slot| ResourceStatus {
            name: slot.desc.name,
            kind: slot.desc.kind,
            role: slot.desc.role,
            ref_count: slot.ref_count(),
            handle: slot.handle().map(Handle::id),
            implemented: slot.imp.is_some(),
            init_skip: false,
            power_ctrl: None,
        })
    }
}
