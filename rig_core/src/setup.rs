//! Interactive load-cell calibration.
//!
//! The operator unloads the sensor, presses a key, then loads a known weight
//! and types it in. The resulting scale and zero point are installed on the
//! cell and persisted.
use embedded_io::{Read, Write};
use embedded_storage::Storage;
use rig_traits::LoadCell;
use tracing::{info, warn};

use crate::calibration::Calibration;
use crate::config::SampleCounts;
use crate::console::{getch, scan_f64, write_line, write_str};
use crate::error::{Result, RigError};
use crate::hw_error::map_hw_error;
use crate::persist;

#[derive(Debug, Clone, Copy, Default)]
pub struct SetupParams {
    pub samples: SampleCounts,
    /// Storage address of the calibration record.
    pub base_address: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupOutcome {
    /// Constants now active on the cell.
    pub calibration: Calibration,
    /// Whether they also reached storage.
    pub persisted: bool,
}

/// Run the calibration dialogue on `console`.
///
/// Malformed or non-positive weights are re-prompted. A storage failure is
/// reported to the operator and in the outcome; the new constants stay
/// active for the session either way.
pub fn run_setup<L, P, S>(
    cell: &mut L,
    console: &mut P,
    storage: &mut S,
    params: SetupParams,
) -> Result<SetupOutcome>
where
    L: LoadCell + ?Sized,
    P: Read + Write + ?Sized,
    S: Storage,
    S::Error: std::fmt::Debug,
{
    write_line(console, "Load cell setup: scale and zero point.")?;
    write_line(console, "")?;
    write_line(console, "The sensor must be unloaded.")?;
    write_line(console, "Remove any weight and press any key.")?;
    getch(console)?;

    cell.set_scale(1.0);
    let offset = cell
        .tare(params.samples.tare)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;

    let weight = prompt_weight(console)?;

    let reading = cell
        .units(params.samples.units)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
    let calibration = Calibration::new(reading / weight, offset);
    if !calibration.is_usable() {
        // Nothing on the sensor; a zero scale would poison every later reading.
        return Err(RigError::State(format!(
            "no load detected (reading {reading}); scale would be {}",
            calibration.scale
        ))
        .into());
    }
    calibration.apply(cell);
    info!(
        scale = calibration.scale,
        offset = calibration.offset,
        weight,
        "calibration measured"
    );

    let persisted = match persist::save(storage, params.base_address, &calibration) {
        Ok(_) => {
            write_line(console, "Settings saved to EEPROM.")?;
            true
        }
        Err(e) => {
            warn!(error = %e, "calibration not persisted");
            write_line(console, "ERROR saving settings to EEPROM.")?;
            write_line(console, "The new settings stay active for this session.")?;
            false
        }
    };

    Ok(SetupOutcome {
        calibration,
        persisted,
    })
}

fn prompt_weight<P: Read + Write + ?Sized>(console: &mut P) -> Result<f64> {
    loop {
        write_str(console, "Load the sensor with a known weight. Enter the weight, kg: ")?;
        match scan_f64(console) {
            Ok(w) if w.is_finite() && w > 0.0 => {
                write_line(console, "")?;
                return Ok(w);
            }
            Ok(w) => {
                write_line(console, "")?;
                write_line(console, &format!("Weight must be positive, got {w}."))?;
            }
            Err(e) => match e.downcast_ref::<RigError>() {
                Some(RigError::Input(bad)) => {
                    write_line(console, "")?;
                    write_line(console, &format!("Invalid number: {bad}."))?;
                }
                _ => return Err(e),
            },
        }
    }
}
