#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement logic for the rig (hardware-agnostic).
//!
//! Hardware is reached only through `rig_traits` (`LoadCell`, `EdgeInterrupt`,
//! `Clock`), `embedded-io` byte streams and `embedded-storage` non-volatile
//! memory.
//!
//! ## Architecture
//!
//! - **Calibration**: linear raw→units model and its checksummed record (`calibration`)
//! - **Persistence**: write-if-changed save, verified load, preload with fallback (`persist`)
//! - **Rotation**: debounced pulse timing with a filtered speed (`rotation`)
//! - **Filtering**: first-order low-pass and moving average (`filter`)
//! - **Setup**: interactive calibration over a byte-stream console (`setup`, `console`)

pub mod calibration;
pub mod checksum;
pub mod config;
pub mod console;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod persist;
pub mod rotation;
pub mod setup;
pub mod util;

pub use calibration::{Calibration, DEFAULT_OFFSET, DEFAULT_SCALE, RECORD_LEN};
pub use config::{RotationParams, SampleCounts};
pub use error::{InputError, Result, RigError};
pub use filter::MovingAverage;
pub use persist::Preload;
pub use rotation::{RotationSensor, RotationState};
pub use setup::{SetupOutcome, SetupParams, run_setup};
