//! Subcommand bodies, generic over the pin and storage backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_storage::Storage;
use eyre::{Result, WrapErr};
use rig_config::Config;
use rig_core::calibration::Calibration;
use rig_core::error::RigError;
use rig_core::filter::MovingAverage;
use rig_core::persist::{self, Preload};
use rig_core::rotation::RotationSensor;
use rig_core::setup::{SetupParams, run_setup};
use rig_hardware::hx711::Hx711;
use rig_traits::{Clock, EdgeInterrupt, MonotonicClock};
use serde_json::json;

use crate::stdio::StdConsole;

/// Poll period of the speed monitor loop.
const MONITOR_TICK: Duration = Duration::from_millis(10);

pub struct Ctx<'a> {
    pub cfg: &'a Config,
    pub json: bool,
    pub shutdown: Arc<AtomicBool>,
}

impl Ctx<'_> {
    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn base(&self) -> u32 {
        self.cfg.storage.base_address
    }
}

fn source_name(p: &Preload) -> &'static str {
    if p.is_stored() { "stored" } else { "defaults" }
}

/// Install the stored calibration, or the configured fallback.
fn preload<D, K, S>(ctx: &Ctx<'_>, hx: &mut Hx711<D, K>, storage: &mut S) -> Result<Preload>
where
    D: InputPin,
    K: OutputPin,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    let defaults = Calibration::from(&ctx.cfg.calibration);
    persist::preload(storage, ctx.base(), hx, defaults)
}

pub fn read<D, K, S>(
    ctx: &Ctx<'_>,
    hx: &mut Hx711<D, K>,
    storage: &mut S,
    samples: Option<u8>,
    smooth: usize,
    count: u32,
) -> Result<()>
where
    D: InputPin,
    K: OutputPin,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    let loaded = preload(ctx, hx, storage)?;
    hx.power_up()?;
    let n = samples.unwrap_or(ctx.cfg.loadcell.units_samples);
    let mut window: Option<MovingAverage> = None;

    for seq in 0..count.max(1) {
        if ctx.stopping() {
            break;
        }
        let units = hx.units(n)?;
        let shown = if smooth > 1 {
            window
                .get_or_insert_with(|| MovingAverage::new(smooth, units))
                .push(units)
        } else {
            units
        };
        if ctx.json {
            println!(
                "{}",
                json!({
                    "seq": seq,
                    "units": shown,
                    "raw": hx.last_raw(),
                    "calibration": source_name(&loaded),
                })
            );
        } else {
            println!("{shown:.3}");
        }
    }

    hx.power_down()?;
    Ok(())
}

pub fn tare<D, K, S>(ctx: &Ctx<'_>, hx: &mut Hx711<D, K>, storage: &mut S) -> Result<()>
where
    D: InputPin,
    K: OutputPin,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    preload(ctx, hx, storage)?;
    hx.power_up()?;
    let offset = hx.tare(ctx.cfg.loadcell.tare_samples)?;
    let cal = Calibration::from_cell(&*hx);
    let written = persist::save(storage, ctx.base(), &cal)?;
    if ctx.json {
        println!(
            "{}",
            json!({ "offset": offset, "scale": cal.scale, "bytes_written": written })
        );
    } else {
        println!("Tare complete: offset {offset} (scale {})", cal.scale);
    }
    Ok(())
}

pub fn calibrate<D, K, S>(ctx: &Ctx<'_>, hx: &mut Hx711<D, K>, storage: &mut S) -> Result<()>
where
    D: InputPin,
    K: OutputPin,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    hx.power_up()?;
    let params = SetupParams {
        samples: (&ctx.cfg.loadcell).into(),
        base_address: ctx.base(),
    };
    let outcome = run_setup(hx, &mut StdConsole, storage, params)?;
    if ctx.json {
        println!(
            "{}",
            json!({
                "scale": outcome.calibration.scale,
                "offset": outcome.calibration.offset,
                "persisted": outcome.persisted,
            })
        );
    } else {
        println!(
            "Calibration: scale {} offset {}",
            outcome.calibration.scale, outcome.calibration.offset
        );
    }
    if !outcome.persisted {
        return Err(RigError::Storage("calibration active but not persisted".into()).into());
    }
    Ok(())
}

pub fn speed<E: EdgeInterrupt + ?Sized>(
    ctx: &Ctx<'_>,
    edges: &mut E,
    duration_ms: u64,
    report_ms: u64,
) -> Result<()> {
    let hall = ctx
        .cfg
        .pins
        .hall
        .ok_or_else(|| RigError::Config("pins.hall is not set".into()))?;
    let clock = MonotonicClock::new();
    let mut sensor = RotationSensor::new(hall, clock, (&ctx.cfg.rotation).into());
    sensor.start(edges).wrap_err("start rotation sensor")?;

    let t0 = clock.now();
    let mut next_report = report_ms;
    loop {
        let elapsed = clock.ms_since(t0);
        if elapsed >= duration_ms || ctx.stopping() {
            break;
        }
        if report_ms > 0 && elapsed >= next_report {
            if !ctx.json {
                println!(
                    "t={elapsed}ms speed={:.1} rpm rotates={}",
                    sensor.speed(),
                    sensor.rotates()
                );
            }
            next_report += report_ms;
        }
        let left = Duration::from_millis(duration_ms - elapsed);
        clock.sleep(left.min(MONITOR_TICK));
    }

    if ctx.json {
        println!(
            "{}",
            json!({ "speed_rpm": sensor.speed(), "rotates": sensor.rotates(), "pin": hall })
        );
    } else {
        println!(
            "Speed: {:.1} rpm, rotates: {}",
            sensor.speed(),
            sensor.rotates()
        );
    }
    Ok(())
}

pub fn self_check<D, K, S>(ctx: &Ctx<'_>, hx: &mut Hx711<D, K>, storage: &mut S) -> Result<()>
where
    D: InputPin,
    K: OutputPin,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    hx.power_up()?;
    let raw = hx.read()?;
    let stored = persist::load(storage, ctx.base())?;
    if ctx.json {
        println!(
            "{}",
            json!({
                "hx711": "ok",
                "gain": hx.gain().factor(),
                "raw": raw,
                "calibration": if stored.is_some() { "stored" } else { "missing" },
            })
        );
    } else {
        println!("HX711: ok (gain {}, raw {raw})", hx.gain().factor());
        match stored {
            Some(c) => println!("Calibration: stored (scale {}, offset {})", c.scale, c.offset),
            None => println!("Calibration: missing, defaults will be used"),
        }
        println!("OK");
    }
    Ok(())
}
