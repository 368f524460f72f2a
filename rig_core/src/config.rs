//! Runtime parameter structs.
//!
//! Kept apart from the TOML schema in `rig_config`; see `conversions` for the bridge.

/// Pulse-timing capture parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationParams {
    /// Minimum spacing between accepted edges. Values below 1 are treated as 1.
    pub debounce_ms: u64,
    /// Low-pass time constant in seconds.
    pub time_constant_s: f64,
}

impl Default for RotationParams {
    fn default() -> Self {
        Self {
            debounce_ms: 1,
            time_constant_s: 2.0,
        }
    }
}

/// How many conversions each load-cell operation averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCounts {
    pub tare: u8,
    pub units: u8,
}

impl Default for SampleCounts {
    fn default() -> Self {
        Self { tare: 10, units: 10 }
    }
}
