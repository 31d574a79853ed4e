//! Board resource manager
//!
//! Catalogues the named peripherals and devices of a board in static tables,
//! then brings them up and tears them down at run time with reference counting
//! and power-control chaining.
//!
//! # Architecture Layers
//!
//! ```text
//! Application / device test code
//!         ↓
//! BoardManager facade (this crate - manager)
//!         ↓
//! DeviceRegistry ──power_ctrl──> ExtraFnTable
//!         ↓
//! PeripheralRegistry
//!         ↓
//! Driver init/deinit functions (vendor HAL, mocks)
//! ```
//!
//! # Building Blocks
//!
//! - [`BoardDef`] - the complete static description of one board
//! - [`PeripheralRegistry`] - buses and controllers, keyed by `(kind, role)`
//! - [`DeviceRegistry`] - codecs, displays, power switches, keyed by kind
//! - [`ExtraFnTable`] - auxiliary functions resolved by name
//! - [`BoardManager`] - ordered bulk bring-up and teardown
//! - [`BoardStatus`] - diagnostic snapshot of every resource
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls and the [`mocks`] module
//! - `tracing`: log through `tracing` (host builds)
//! - `defmt`: log through `defmt` and derive `defmt::Format` (target builds)
//! - `serde`: `Serialize` on the status report
//!
//! # Example
//!
//! ```no_run
//! use board_manager::{BoardDef, BoardManager};
//!
//! fn bring_up(board: &'static BoardDef) {
//!     let mut manager = BoardManager::new(board);
//!     manager.init().unwrap();
//!     let _codec = manager.device_handle("audio_dac").unwrap();
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod descriptor;
pub mod device;
pub mod error;
pub mod extra_fn;
pub mod handle;
mod instance;
pub mod manager;
pub mod peripheral;
pub mod status;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use descriptor::{
    BoardDef, BoardEntry, BoardInfo, DeviceDesc, DeviceImpl, PeripheralDesc, PeripheralImpl,
};
pub use device::{DeviceContext, DeviceDeinitFn, DeviceInitFn, DeviceRegistry};
pub use error::{BoardError, DriverError, Error};
pub use extra_fn::{ExtraFn, ExtraFnEntry, ExtraFnTable, PowerCtrlFn, POWER_CTRL_SUFFIX};
pub use handle::{Config, Handle, HandleId};
pub use instance::BulkReport;
pub use manager::BoardManager;
pub use peripheral::{PeriphDeinitFn, PeriphInitFn, PeripheralRegistry};
pub use status::{BoardStatus, ResourceStatus};
