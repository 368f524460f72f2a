#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `rig`: operator front-end for the load cell and rotation sensor.

mod cli;
mod commands;
mod error_fmt;
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
mod sim;
mod stdio;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use embedded_hal::digital::{InputPin, OutputPin};
use eyre::{Result, WrapErr};
use rig_config::Config;
use rig_core::error::RigError;
use rig_hardware::eeprom::FileEeprom;
use rig_hardware::hx711::{Gain, Hx711};
use rig_hardware::util::ReadyPolicy;
use rig_traits::EdgeInterrupt;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::commands::Ctx;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(&cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::error!(error = %e, "command failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: &Cli) -> Result<()> {
    color_eyre::install()?;
    let cfg = rig_config::load_file(&cli.config)?;
    init_tracing(cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let mut storage = open_storage(&cfg)?;
    let gain = Gain::try_from(cfg.loadcell.gain)?;
    let policy = ReadyPolicy::from_timeout_ms(cfg.loadcell.ready_timeout_ms);
    let ctx = Ctx {
        cfg: &cfg,
        json: cli.json,
        shutdown,
    };
    run_backend(&ctx, &cli.cmd, gain, policy, &mut storage)
}

/// Raspberry Pi GPIO.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn run_backend(
    ctx: &Ctx<'_>,
    cmd: &Commands,
    gain: Gain,
    policy: ReadyPolicy,
    storage: &mut FileEeprom,
) -> Result<()> {
    if matches!(cmd, Commands::Speed { .. }) {
        let mut edges = rig_hardware::rpi::RpiEdges::new()?;
        return dispatch_speed(ctx, cmd, &mut edges);
    }
    let pins = &ctx.cfg.pins;
    let mut hx = rig_hardware::rpi::open_hx711(pins.hx711_dt, pins.hx711_sck, gain, policy)
        .wrap_err("open hx711")?;
    dispatch(ctx, cmd, &mut hx, storage)
}

/// Simulated devices steered by `RIG_SIM_*`.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn run_backend(
    ctx: &Ctx<'_>,
    cmd: &Commands,
    gain: Gain,
    policy: ReadyPolicy,
    storage: &mut FileEeprom,
) -> Result<()> {
    let settings = sim::SimSettings::from_env()?;
    if matches!(cmd, Commands::Speed { .. }) {
        let mut edges = rig_hardware::sim::SimEdges::new();
        let _spinner = match (ctx.cfg.pins.hall, settings.rpm) {
            (Some(pin), Some(rpm)) => sim::Spinner::start(edges.clone(), pin, rpm),
            _ => None,
        };
        return dispatch_speed(ctx, cmd, &mut edges);
    }
    let unloaded = matches!(cmd, Commands::Calibrate).then_some(ctx.cfg.loadcell.tare_samples);
    let (_sim, mut hx) = settings.open_hx711(gain, policy, unloaded)?;
    dispatch(ctx, cmd, &mut hx, storage)
}

fn open_storage(cfg: &Config) -> Result<FileEeprom> {
    let path = &cfg.storage.eeprom_path;
    FileEeprom::open(path, cfg.storage.capacity).map_err(|e| {
        eyre::Report::new(RigError::Storage(format!(
            "open eeprom image {}: {e}",
            path.display()
        )))
    })
}

fn dispatch<D: InputPin, K: OutputPin>(
    ctx: &Ctx<'_>,
    cmd: &Commands,
    hx: &mut Hx711<D, K>,
    storage: &mut FileEeprom,
) -> Result<()> {
    match cmd {
        Commands::Read {
            samples,
            smooth,
            count,
        } => commands::read(ctx, hx, storage, *samples, *smooth, *count),
        Commands::Tare => commands::tare(ctx, hx, storage),
        Commands::Calibrate => commands::calibrate(ctx, hx, storage),
        Commands::SelfCheck => commands::self_check(ctx, hx, storage),
        Commands::Speed { .. } => Err(RigError::State("speed needs no load cell".into()).into()),
    }
}

fn dispatch_speed<E: EdgeInterrupt + ?Sized>(
    ctx: &Ctx<'_>,
    cmd: &Commands,
    edges: &mut E,
) -> Result<()> {
    match cmd {
        Commands::Speed {
            duration_ms,
            report_ms,
        } => commands::speed(ctx, edges, *duration_ms, *report_ms),
        _ => Err(RigError::State("not a speed command".into()).into()),
    }
}

/// Console logs go to stderr (stdout carries results); `[logging] file`
/// adds a JSON-lines file sink.
fn init_tracing(cli: &Cli, logging: &rig_config::Logging) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("log level {level:?}"))?,
    };

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
