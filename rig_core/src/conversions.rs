//! `From` implementations bridging `rig_config` types to `rig_core` types.

use crate::calibration::Calibration;
use crate::config::{RotationParams, SampleCounts};

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&rig_config::CalibrationCfg> for Calibration {
    fn from(c: &rig_config::CalibrationCfg) -> Self {
        Self::new(c.default_scale, c.default_offset)
    }
}

// ── RotationParams ───────────────────────────────────────────────────────────

impl From<&rig_config::RotationCfg> for RotationParams {
    fn from(c: &rig_config::RotationCfg) -> Self {
        Self {
            debounce_ms: c.debounce_ms,
            time_constant_s: c.time_constant_s,
        }
    }
}

// ── SampleCounts ─────────────────────────────────────────────────────────────

impl From<&rig_config::LoadCellCfg> for SampleCounts {
    fn from(c: &rig_config::LoadCellCfg) -> Self {
        Self {
            tare: c.tare_samples,
            units: c.units_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_default_runtime_values() {
        let cfg = rig_config::load_toml("[pins]\nhx711_dt = 5\nhx711_sck = 6\n").unwrap();
        assert_eq!(Calibration::from(&cfg.calibration), Calibration::default());
        assert_eq!(RotationParams::from(&cfg.rotation), RotationParams::default());
        assert_eq!(SampleCounts::from(&cfg.loadcell), SampleCounts::default());
    }
}
