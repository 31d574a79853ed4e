//! Runtime instance storage shared by both registries.
//!
//! One slot per descriptor, created when the registry is built and never
//! removed. Slots are kept in declared order for bulk walks, with a name index
//! and a handle index on the side so single-resource calls and reverse lookups
//! do not scan.
//!
//! Invariant kept by every method here: `ref_count == 0 ⇔ handle.is_none()`.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::descriptor::{DeviceDesc, PeripheralDesc};
use crate::error::Error;
use crate::handle::{Handle, HandleId};

/// Descriptors the instance table can key by name.
pub(crate) trait Named {
    fn name(&self) -> &'static str;
}

impl Named for PeripheralDesc {
    fn name(&self) -> &'static str {
        self.name
    }
}

impl Named for DeviceDesc {
    fn name(&self) -> &'static str {
        self.name
    }
}

/// Mutable state of one named resource.
pub(crate) struct Slot<D: 'static, I: 'static, X> {
    pub desc: &'static D,
    /// `None` when no implementation matched at build time.
    pub imp: Option<&'static I>,
    handle: Option<Handle>,
    ref_count: u32,
    /// Registry-specific bookkeeping.
    pub ext: X,
}

impl<D: 'static, I: 'static, X> Slot<D, I, X> {
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn is_active(&self) -> bool {
        self.ref_count > 0
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut Handle> {
        self.handle.as_mut()
    }
}

/// Outcome of dropping one reference.
pub(crate) enum Release {
    /// Slot was already inactive; nothing changed.
    Inactive,
    /// Other references remain.
    StillReferenced(u32),
    /// Last reference dropped; the caller must run deinit on this handle.
    Last(Handle),
}

pub(crate) struct InstanceTable<D: 'static, I: 'static, X> {
    slots: Vec<Slot<D, I, X>>,
    by_name: BTreeMap<&'static str, usize>,
    by_handle: BTreeMap<HandleId, usize>,
}

impl<D: Named + 'static, I: 'static, X: Default> InstanceTable<D, I, X> {
    /// One slot per descriptor, implementation resolved once up front.
    pub fn new(descs: &'static [D], resolve: impl Fn(&D) -> Option<&'static I>) -> Self {
        let mut slots = Vec::with_capacity(descs.len());
        let mut by_name = BTreeMap::new();
        for desc in descs {
            let name = desc.name();
            if by_name.contains_key(name) {
                warn!("duplicate resource name '{}', keeping first declaration", name);
                continue;
            }
            by_name.insert(name, slots.len());
            slots.push(Slot {
                desc,
                imp: resolve(desc),
                handle: None,
                ref_count: 0,
                ext: X::default(),
            });
        }
        Self {
            slots,
            by_name,
            by_handle: BTreeMap::new(),
        }
    }
}

impl<D: 'static, I: 'static, X> InstanceTable<D, I, X> {
    /// Slot index for `name`.
    ///
    /// Empty names are rejected before the lookup.
    pub fn index(&self, name: &str) -> Result<usize, Error> {
        if name.is_empty() {
            return Err(Error::InvalidArgument);
        }
        self.by_name.get(name).copied().ok_or(Error::NotFound)
    }

    pub fn index_of_handle(&self, id: HandleId) -> Option<usize> {
        self.by_handle.get(&id).copied()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot<D, I, X>> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<D, I, X>> {
        self.slots.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Slot<D, I, X>> {
        self.slots.iter()
    }

    /// Store the handle of a freshly initialized resource (0 → 1).
    pub fn activate(&mut self, index: usize, handle: Handle) -> Result<(), Error> {
        let slot = self.slots.get_mut(index).ok_or(Error::NotFound)?;
        self.by_handle.insert(handle.id(), index);
        slot.handle = Some(handle);
        slot.ref_count = 1;
        Ok(())
    }

    /// Add a reference to an active resource.
    pub fn retain(&mut self, index: usize) -> Result<u32, Error> {
        let slot = self.slots.get_mut(index).ok_or(Error::NotFound)?;
        if slot.ref_count == 0 {
            return Err(Error::NotActive);
        }
        slot.ref_count = slot.ref_count.saturating_add(1);
        Ok(slot.ref_count)
    }

    /// Drop one reference, handing the handle back on the last one.
    pub fn release(&mut self, index: usize) -> Result<Release, Error> {
        let slot = self.slots.get_mut(index).ok_or(Error::NotFound)?;
        match slot.ref_count {
            0 => Ok(Release::Inactive),
            1 => {
                slot.ref_count = 0;
                match slot.handle.take() {
                    Some(handle) => {
                        self.by_handle.remove(&handle.id());
                        Ok(Release::Last(handle))
                    }
                    None => Ok(Release::Inactive),
                }
            }
            n => {
                slot.ref_count = n.saturating_sub(1);
                Ok(Release::StillReferenced(slot.ref_count))
            }
        }
    }
}

/// Result of a best-effort bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BulkReport {
    /// Resources the operation was tried on.
    pub attempted: usize,
    /// Resources it succeeded on.
    pub succeeded: usize,
    /// Resources it failed on.
    pub failed: usize,
    /// Resources left out (`init_skip`, or already inactive on teardown).
    pub skipped: usize,
    /// First failure seen.
    pub first_error: Option<Error>,
}

impl BulkReport {
    pub(crate) fn record(&mut self, result: Result<(), Error>) {
        self.attempted = self.attempted.saturating_add(1);
        match result {
            Ok(()) => self.succeeded = self.succeeded.saturating_add(1),
            Err(err) => {
                self.failed = self.failed.saturating_add(1);
                self.first_error.get_or_insert(err);
            }
        }
    }

    pub(crate) fn skip(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }

    /// `true` when something was attempted and nothing succeeded.
    pub fn is_total_failure(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::handle::Config;

    static DESCS: [PeripheralDesc; 3] = [
        PeripheralDesc::new("i2c_master", "i2c", "master", Config::NONE),
        PeripheralDesc::new("spi_master", "spi", "master", Config::NONE),
        PeripheralDesc::new("i2c_master", "i2c", "slave", Config::NONE),
    ];

    static IMPL: u8 = 0;

    fn table() -> InstanceTable<PeripheralDesc, u8, ()> {
        InstanceTable::new(&DESCS, |desc| (desc.kind == "i2c").then_some(&IMPL))
    }

    #[test]
    fn duplicate_names_keep_first_declaration() {
        let table = table();
        assert_eq!(table.len(), 2);
        let idx = table.index("i2c_master").unwrap();
        assert_eq!(table.slot(idx).unwrap().desc.role, "master");
    }

    #[test]
    fn implementation_resolved_at_build() {
        let table = table();
        let spi = table.index("spi_master").unwrap();
        assert!(table.slot(spi).unwrap().imp.is_none());
    }

    #[test]
    fn index_rejects_empty_and_unknown() {
        let table = table();
        assert_eq!(table.index(""), Err(Error::InvalidArgument));
        assert_eq!(table.index("uart0"), Err(Error::NotFound));
    }

    #[test]
    fn activate_retain_release_cycle() {
        let mut table = table();
        let idx = table.index("i2c_master").unwrap();
        let handle = Handle::new(7u16);
        let id = handle.id();

        table.activate(idx, handle).unwrap();
        assert_eq!(table.index_of_handle(id), Some(idx));
        assert_eq!(table.retain(idx), Ok(2));

        assert!(matches!(table.release(idx), Ok(Release::StillReferenced(1))));
        match table.release(idx) {
            Ok(Release::Last(handle)) => assert_eq!(handle.id(), id),
            _ => unreachable!("second release must be the last one"),
        }
        assert!(table.slot(idx).unwrap().handle().is_none());
        assert_eq!(table.index_of_handle(id), None);
        assert!(matches!(table.release(idx), Ok(Release::Inactive)));
    }

    #[test]
    fn retain_inactive_is_not_active() {
        let mut table = table();
        let idx = table.index("spi_master").unwrap();
        assert_eq!(table.retain(idx), Err(Error::NotActive));
    }

    #[test]
    fn bulk_report_total_failure() {
        let mut report = BulkReport::default();
        assert!(!report.is_total_failure());
        report.record(Err(Error::NotFound));
        report.record(Err(Error::NoImplementation));
        assert!(report.is_total_failure());
        assert_eq!(report.first_error, Some(Error::NotFound));
        report.record(Ok(()));
        assert!(!report.is_total_failure());
    }
}
