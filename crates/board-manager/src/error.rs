//! Error taxonomy.
//!
//! Three layers, each with a stable numeric code and a static description:
//!
//! - [`DriverError`] - returned by driver init/deinit/extra functions
//! - [`Error`] - returned by the peripheral and device registries
//! - [`BoardError`] - returned by the [`BoardManager`](crate::BoardManager) facade
//!
//! Codes are negative and grouped per layer (`-1xx` driver, `-2xx` registry,
//! `-3xx` facade) so a single `i32` is enough to identify a failure in logs.

use core::fmt;

/// Failure reported by a driver function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Bus transaction failed
    Communication,
    /// Hardware did not respond in time
    Timeout,
    /// Configuration blob missing, of the wrong type or out of range
    InvalidConfig,
    /// Operation not supported by this driver
    Unsupported,
    /// Resource is busy
    Busy,
    /// A registry call made by the driver failed; carries that error's code
    Dependency(i32),
    /// Driver-specific code
    Other(i32),
}

impl DriverError {
    /// Stable numeric code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Communication => -101,
            Self::Timeout => -102,
            Self::InvalidConfig => -103,
            Self::Unsupported => -104,
            Self::Busy => -105,
            Self::Dependency(_) => -106,
            Self::Other(_) => -107,
        }
    }

    /// Static description.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Communication => "driver communication error",
            Self::Timeout => "driver timeout",
            Self::InvalidConfig => "invalid driver configuration",
            Self::Unsupported => "operation not supported by driver",
            Self::Busy => "driver busy",
            Self::Dependency(_) => "driver dependency failed",
            Self::Other(_) => "driver specific error",
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependency(code) | Self::Other(code) => write!(f, "{} ({code})", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

/// Registry error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Empty name or unusable argument
    InvalidArgument,
    /// No descriptor with that name
    NotFound,
    /// Descriptor exists but no matching implementation is registered
    NoImplementation,
    /// Device descriptor exists but no handle slot was allocated for it
    NoHandleSlot,
    /// Resource is not initialized
    NotActive,
    /// Device has no power-control device configured
    NoPowerCtrl,
    /// The driver init function failed
    InitFailed(DriverError),
    /// The driver deinit function failed
    DeinitFailed(DriverError),
    /// The power-control extra function failed
    PowerCtrlFailed(DriverError),
}

impl Error {
    /// Stable numeric code.
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => -201,
            Self::NotFound => -202,
            Self::NoImplementation => -203,
            Self::NoHandleSlot => -204,
            Self::NotActive => -205,
            Self::NoPowerCtrl => -206,
            Self::InitFailed(_) => -207,
            Self::DeinitFailed(_) => -208,
            Self::PowerCtrlFailed(_) => -209,
        }
    }

    /// Static description.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::NotFound => "resource not found",
            Self::NoImplementation => "no implementation registered",
            Self::NoHandleSlot => "no handle slot for device",
            Self::NotActive => "resource not initialized",
            Self::NoPowerCtrl => "no power control device",
            Self::InitFailed(_) => "init failed",
            Self::DeinitFailed(_) => "deinit failed",
            Self::PowerCtrlFailed(_) => "power control failed",
        }
    }

    /// Underlying driver failure, if any.
    pub const fn driver_error(self) -> Option<DriverError> {
        match self {
            Self::InitFailed(e) | Self::DeinitFailed(e) | Self::PowerCtrlFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.driver_error() {
            Some(cause) => write!(f, "{}: {cause}", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<Error> for DriverError {
    fn from(err: Error) -> Self {
        DriverError::Dependency(err.code())
    }
}

/// Facade error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardError {
    /// `init()` called twice
    AlreadyInitialized,
    /// `deinit()` called before `init()`
    NotInitialized,
    /// Peripheral registry failure
    Peripheral(Error),
    /// Device registry failure
    Device(Error),
}

impl BoardError {
    /// Stable numeric code. The wrapped registry code is available through
    /// [`registry_error`](Self::registry_error).
    pub const fn code(self) -> i32 {
        match self {
            Self::AlreadyInitialized => -301,
            Self::NotInitialized => -302,
            Self::Peripheral(_) => -303,
            Self::Device(_) => -304,
        }
    }

    /// Static description.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "board already initialized",
            Self::NotInitialized => "board not initialized",
            Self::Peripheral(_) => "peripheral error",
            Self::Device(_) => "device error",
        }
    }

    /// The wrapped registry error, if any.
    pub const fn registry_error(self) -> Option<Error> {
        match self {
            Self::Peripheral(e) | Self::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry_error() {
            Some(cause) => write!(f, "{}: {cause}", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BoardError {}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn codes_are_unique_per_layer() {
        let errors = [
            Error::InvalidArgument,
            Error::NotFound,
            Error::NoImplementation,
            Error::NoHandleSlot,
            Error::NotActive,
            Error::NoPowerCtrl,
            Error::InitFailed(DriverError::Timeout),
            Error::DeinitFailed(DriverError::Timeout),
            Error::PowerCtrlFailed(DriverError::Timeout),
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in errors.iter().skip(i + 1) {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?} share a code");
            }
        }
    }

    #[test]
    fn display_includes_driver_cause() {
        let err = Error::InitFailed(DriverError::Communication);
        assert_eq!(err.to_string(), "init failed: driver communication error");
    }

    #[test]
    fn board_error_code_names_the_layer() {
        let periph = BoardError::Peripheral(Error::NotFound);
        let device = BoardError::Device(Error::NotFound);
        assert_eq!(periph.code(), -303);
        assert_eq!(device.code(), -304);
        assert_eq!(device.registry_error().map(Error::code), Some(-202));
        assert_eq!(BoardError::NotInitialized.registry_error(), None);

        let err = BoardError::Device(Error::NoHandleSlot);
        assert_eq!(err.to_string(), "device error: no handle slot for device");
    }

    #[test]
    fn board_error_codes_are_unique() {
        let errors = [
            BoardError::AlreadyInitialized,
            BoardError::NotInitialized,
            BoardError::Peripheral(Error::NotActive),
            BoardError::Device(Error::NotActive),
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in errors.iter().skip(i + 1) {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?} share a code");
            }
        }
    }

    #[test]
    fn driver_error_from_registry_error_carries_code() {
        let err: DriverError = Error::NotFound.into();
        assert_eq!(err, DriverError::Dependency(-202));
        assert_eq!(err.to_string(), "driver dependency failed (-202)");
    }
}
