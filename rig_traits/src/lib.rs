//! Collaborator seams between the acquisition logic and the platform.
//!
//! Pins themselves are `embedded-hal` digital pins owned by the drivers; the
//! traits here cover what `embedded-hal` does not: a time source, edge
//! interrupt registration, and a calibrated load-cell view used by the
//! calibration procedure.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type carried across collaborator boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked once per falling edge.
pub type EdgeHandler = Box<dyn FnMut() + Send + 'static>;

/// Registration of falling-edge interrupt handlers.
///
/// `attach_falling_edge` configures `pin` as a pulled-up input and arranges
/// for `handler` to run on every falling edge, asynchronously to the caller.
pub trait EdgeInterrupt {
    fn attach_falling_edge(&mut self, pin: u8, handler: EdgeHandler) -> Result<(), BoxError>;
}

/// A load cell that converts raw codes into physical units.
///
/// `times` is the number of conversions to average; implementations treat 0 as 1.
pub trait LoadCell {
    /// Average `times` conversions and make the result the new zero point.
    fn tare(&mut self, times: u8) -> Result<i32, BoxError>;
    /// Average `times` conversions, subtract the offset and divide by the scale.
    fn units(&mut self, times: u8) -> Result<f64, BoxError>;
    fn set_scale(&mut self, scale: f64);
    fn scale(&self) -> f64;
    fn set_offset(&mut self, offset: i32);
    fn offset(&self) -> i32;
}
