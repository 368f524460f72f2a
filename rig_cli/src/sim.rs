//! Simulated backend used when the `hardware` feature is off.
//!
//! Knobs come from the environment:
//! - `RIG_SIM_RAW`: raw code of the unloaded cell (decimal or `0x` hex)
//! - `RIG_SIM_LOAD`: raw counts added by the "known weight"
//! - `RIG_SIM_NOT_READY`: any non-empty value keeps DOUT high
//! - `RIG_SIM_RPM`: spin the simulated hall sensor at this speed

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use eyre::{Result, WrapErr};
use rig_hardware::hx711::{Gain, Hx711};
use rig_hardware::sim::{SimDout, SimEdges, SimHx711, SimSck};
use rig_hardware::util::ReadyPolicy;

pub const RAW_ENV: &str = "RIG_SIM_RAW";
pub const LOAD_ENV: &str = "RIG_SIM_LOAD";
pub const NOT_READY_ENV: &str = "RIG_SIM_NOT_READY";
pub const RPM_ENV: &str = "RIG_SIM_RPM";

/// A simulated device that is not ready stays that way; never block on it forever.
const SIM_READY_BOUND_MS: u64 = 1_000;

pub type SimCell = Hx711<SimDout, SimSck>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSettings {
    pub raw: u32,
    pub load: u32,
    pub not_ready: bool,
    pub rpm: Option<f64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            raw: rig_core::DEFAULT_OFFSET.unsigned_abs(),
            load: 0,
            not_ready: false,
            rpm: None,
        }
    }
}

fn parse_code(s: &str) -> Result<u32> {
    let s = s.trim();
    let v = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    let v = v.wrap_err_with(|| format!("invalid raw code {s:?}"))?;
    if v > 0x00FF_FFFF {
        eyre::bail!("raw code {s} does not fit in 24 bits");
    }
    Ok(v)
}

impl SimSettings {
    pub fn from_env() -> Result<Self> {
        let mut s = Self::default();
        if let Ok(v) = std::env::var(RAW_ENV) {
            s.raw = parse_code(&v).wrap_err(RAW_ENV)?;
        }
        if let Ok(v) = std::env::var(LOAD_ENV) {
            s.load = parse_code(&v).wrap_err(LOAD_ENV)?;
        }
        s.not_ready = std::env::var(NOT_READY_ENV).is_ok_and(|v| !v.is_empty());
        if let Ok(v) = std::env::var(RPM_ENV) {
            let rpm: f64 = v
                .trim()
                .parse()
                .wrap_err_with(|| format!("{RPM_ENV}: invalid speed {v:?}"))?;
            s.rpm = Some(rpm);
        }
        Ok(s)
    }

    /// Bring up the simulated HX711.
    ///
    /// With `unloaded_reads`, that many conversions (plus the gain-latching
    /// one) come back unloaded before the load appears; otherwise the load is
    /// on from the start.
    pub fn open_hx711(
        &self,
        gain: Gain,
        policy: ReadyPolicy,
        unloaded_reads: Option<u8>,
    ) -> Result<(SimHx711, SimCell)> {
        let sim = SimHx711::new();
        let loaded = (self.raw + self.load) & 0x00FF_FFFF;
        match unloaded_reads {
            Some(n) => {
                for _ in 0..=n {
                    sim.push_reading(self.raw);
                }
                sim.hold_reading(loaded);
            }
            None => sim.hold_reading(loaded),
        }
        sim.set_not_ready(self.not_ready);

        let policy = match policy {
            ReadyPolicy::Blocking => ReadyPolicy::from_timeout_ms(SIM_READY_BOUND_MS),
            bounded => bounded,
        };
        let (dout, sck) = sim.pins();
        let cell = Hx711::new_with_policy(dout, sck, gain, policy)?;
        Ok((sim, cell))
    }
}

/// Fires falling edges on a background thread at a fixed speed.
pub struct Spinner {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    pub fn start(edges: SimEdges, pin: u8, rpm: f64) -> Option<Self> {
        let interval = rig_core::util::interval_ms_from_rpm(rpm)?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(interval));
                edges.fire(pin);
            }
        });
        tracing::debug!(pin, rpm, interval_ms = interval, "sim spinner started");
        Some(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
