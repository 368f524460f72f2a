#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the measurement rig.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! `Config::validate`. Every section except `[pins]` is optional and falls
//! back to the defaults documented on each field.
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Byte length of the persisted calibration record, used to bound
/// `storage.base_address`.
pub const RECORD_LEN: usize = 16;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// Hall-effect rotation sensor; falling edges are counted.
    pub hall: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoadCellCfg {
    /// 128 | 64 | 32
    pub gain: u8,
    /// Conversions averaged when taring.
    pub tare_samples: u8,
    /// Conversions averaged per unit reading.
    pub units_samples: u8,
    /// Max wait for HX711 data-ready; 0 waits forever.
    pub ready_timeout_ms: u64,
}

impl Default for LoadCellCfg {
    fn default() -> Self {
        Self {
            gain: 128,
            tare_samples: 10,
            units_samples: 10,
            ready_timeout_ms: 0,
        }
    }
}

/// Constants installed when the stored record is missing or corrupt.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CalibrationCfg {
    /// raw codes per unit
    pub default_scale: f64,
    /// raw code at zero load
    pub default_offset: i32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            default_scale: 93_723.34,
            default_offset: 0x7E_AE6E,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RotationCfg {
    /// Minimum spacing between accepted edges.
    pub debounce_ms: u64,
    /// Low-pass time constant applied to the per-edge speed.
    pub time_constant_s: f64,
}

impl Default for RotationCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 1,
            time_constant_s: 2.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// File backing the EEPROM image in the simulated backend.
    pub eeprom_path: PathBuf,
    pub capacity: usize,
    /// First byte of the calibration record.
    pub base_address: u32,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            eeprom_path: PathBuf::from("var/eeprom.bin"),
            capacity: 1024,
            base_address: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub loadcell: LoadCellCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub rotation: RotationCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
        }
        if let Some(hall) = self.pins.hall
            && (hall == self.pins.hx711_dt || hall == self.pins.hx711_sck)
        {
            eyre::bail!("pins.hall must not share a pin with the HX711");
        }

        // Load cell
        if !matches!(self.loadcell.gain, 128 | 64 | 32) {
            eyre::bail!("loadcell.gain must be one of 128, 64, 32");
        }
        if self.loadcell.tare_samples == 0 {
            eyre::bail!("loadcell.tare_samples must be >= 1");
        }
        if self.loadcell.units_samples == 0 {
            eyre::bail!("loadcell.units_samples must be >= 1");
        }
        if self.loadcell.ready_timeout_ms > 60 * 1000 {
            eyre::bail!("loadcell.ready_timeout_ms is unreasonably large (>60s)");
        }

        // Calibration fallback
        let s = self.calibration.default_scale;
        if !s.is_finite() || s == 0.0 {
            eyre::bail!("calibration.default_scale must be finite and non-zero");
        }

        // Rotation
        if self.rotation.debounce_ms == 0 {
            eyre::bail!("rotation.debounce_ms must be >= 1");
        }
        let t = self.rotation.time_constant_s;
        if !t.is_finite() || t <= 0.0 {
            eyre::bail!("rotation.time_constant_s must be > 0");
        }

        // Storage
        let end = (self.storage.base_address as usize).saturating_add(RECORD_LEN);
        if end > self.storage.capacity {
            eyre::bail!(
                "storage.capacity {} cannot hold the calibration record at base_address {}",
                self.storage.capacity,
                self.storage.base_address
            );
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
