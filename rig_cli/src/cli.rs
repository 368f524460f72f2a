//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rig", version, about = "Load cell and rotation sensor rig")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/rig.toml")]
    pub config: PathBuf,

    /// Emit results and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print calibrated load-cell readings
    Read {
        /// Conversions averaged per reading (defaults to loadcell.units_samples)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..))]
        samples: Option<u8>,
        /// Moving-average window over successive readings (1 = off)
        #[arg(long, value_name = "W", default_value_t = 1)]
        smooth: usize,
        /// Number of readings to print
        #[arg(long, value_name = "K", default_value_t = 1)]
        count: u32,
    },
    /// Zero the load cell at the present load and store the new offset
    Tare,
    /// Interactive calibration with a known weight (stdin/stdout)
    Calibrate,
    /// Report rotation speed from the hall sensor
    Speed {
        /// How long to watch before reporting, in ms
        #[arg(long, value_name = "MS", default_value_t = 5_000)]
        duration_ms: u64,
        /// Interval between progress lines, in ms (0 = final report only)
        #[arg(long, value_name = "MS", default_value_t = 500)]
        report_ms: u64,
    },
    /// Quick health check: HX711 answers, stored calibration validates
    SelfCheck,
}
