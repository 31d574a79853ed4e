//! Configuration blobs and runtime handles.
//!
//! A [`Config`] is the static, read-only configuration attached to a
//! descriptor. A [`Handle`] is the runtime object a driver's init function
//! returns; the registry owns it until the matching deinit.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::DriverError;

/// Typed view over a static configuration blob.
///
/// Built with [`Config::new`] in `static` descriptor tables. Drivers recover
/// the concrete type with [`Config::get`].
#[derive(Clone, Copy)]
pub struct Config {
    data: &'static (dyn Any + Send + Sync),
    size: usize,
}

impl Config {
    /// Empty configuration for resources that need none.
    pub const NONE: Config = Config { data: &(), size: 0 };

    /// Wrap a static configuration value.
    pub const fn new<T: Any + Send + Sync>(data: &'static T) -> Self {
        Self {
            data,
            size: core::mem::size_of::<T>(),
        }
    }

    /// Size of the configuration blob in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// `true` for [`Config::NONE`] and other zero-sized blobs.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if the blob is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.data.is::<T>()
    }

    /// Borrow the blob as a `T`.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidConfig`] if the blob is of another type.
    pub fn get<T: Any>(&self) -> Result<&'static T, DriverError> {
        let data: &'static (dyn Any + Send + Sync) = self.data;
        data.downcast_ref::<T>().ok_or(DriverError::InvalidConfig)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

static NEXT_HANDLE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a [`Handle`].
///
/// Copyable, so driver code that only holds its own handle can still ask the
/// registry for its name or configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HandleId(u32);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime object produced by a driver init function.
pub struct Handle {
    id: HandleId,
    inner: Box<dyn Any>,
}

impl Handle {
    /// Box `value` and assign it a fresh [`HandleId`].
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            id: HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)),
            inner: Box::new(value),
        }
    }

    /// Identity of this handle.
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Returns `true` if the handle wraps a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrow the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Mutably borrow the wrapped value as a `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.inner.downcast_mut::<T>()
    }

    /// Unwrap the value, giving the handle back if it is not a `T`.
    pub fn into_inner<T: Any>(self) -> Result<Box<T>, Self> {
        let id = self.id;
        self.inner.downcast::<T>().map_err(|inner| Self { id, inner })
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct BusConfig {
        port: u8,
        frequency: u32,
    }

    static BUS_CONFIG: BusConfig = BusConfig {
        port: 1,
        frequency: 400_000,
    };

    #[test]
    fn config_round_trips_static_value() {
        let config = Config::new(&BUS_CONFIG);
        assert!(config.is::<BusConfig>());
        assert_eq!(config.size(), core::mem::size_of::<BusConfig>());
        assert_eq!(config.get::<BusConfig>(), Ok(&BUS_CONFIG));
    }

    #[test]
    fn config_wrong_type_is_invalid_config() {
        let config = Config::new(&BUS_CONFIG);
        assert_eq!(config.get::<u32>(), Err(DriverError::InvalidConfig));
    }

    #[test]
    fn none_config_is_empty() {
        assert!(Config::NONE.is_empty());
        assert!(Config::NONE.get::<BusConfig>().is_err());
    }

    #[test]
    fn handle_ids_are_unique() {
        let a = Handle::new(1u8);
        let b = Handle::new(1u8);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn handle_downcast_and_into_inner() {
        let mut handle = Handle::new(41u32);
        *handle.downcast_mut::<u32>().unwrap() += 1;
        assert_eq!(handle.downcast_ref::<u32>(), Some(&42));
        assert!(handle.downcast_ref::<u8>().is_none());

        let id = handle.id();
        let handle = handle.into_inner::<u8>().unwrap_err();
        assert_eq!(handle.id(), id, "failed unwrap keeps identity");
        assert_eq!(*handle.into_inner::<u32>().unwrap(), 42);
    }
}
