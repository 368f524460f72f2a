//! Maps `Box<dyn Error>` from trait boundaries to typed `RigError`.
//!
//! The traits in `rig_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `rig_hardware::HwError` downcasting.

use crate::error::RigError;

/// Map a trait-boundary error to a typed `RigError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RigError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<rig_hardware::error::HwError>() {
            return match hw {
                rig_hardware::error::HwError::DataReadyTimeout => RigError::Timeout,
                rig_hardware::error::HwError::Storage(s) => RigError::Storage(s.clone()),
                other => RigError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        RigError::Timeout
    } else {
        RigError::Hardware(s)
    }
}

/// Map an `embedded-storage` backend error, whose only bound is `Debug`.
pub fn map_storage_error<E: std::fmt::Debug>(e: E) -> RigError {
    RigError::Storage(format!("{e:?}"))
}
