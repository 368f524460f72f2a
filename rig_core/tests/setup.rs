//! Interactive calibration end to end: simulated HX711, scripted console,
//! in-memory EEPROM.

use rig_core::calibration::Calibration;
use rig_core::config::SampleCounts;
use rig_core::error::RigError;
use rig_core::mocks::ScriptedPort;
use rig_core::persist;
use rig_core::setup::{SetupParams, run_setup};
use rig_hardware::eeprom::MemEeprom;
use rig_hardware::hx711::{Gain, Hx711};
use rig_hardware::sim::{SimDout, SimHx711, SimSck};
use rig_traits::LoadCell;

const ZERO: u32 = 1_000;
const LOADED: u32 = ZERO + 50_000;

/// Device that reads `ZERO` through construction and tare, then `LOADED`.
fn rig(samples: SampleCounts) -> (SimHx711, Hx711<SimDout, SimSck>) {
    let sim = SimHx711::new();
    for _ in 0..=samples.tare {
        sim.push_reading(ZERO);
    }
    sim.hold_reading(LOADED);
    let (dout, sck) = sim.pins();
    let cell = Hx711::new(dout, sck, Gain::A128).unwrap();
    (sim, cell)
}

fn params() -> SetupParams {
    SetupParams {
        samples: SampleCounts { tare: 4, units: 4 },
        base_address: 0,
    }
}

#[test]
fn known_weight_sets_scale_and_offset_and_persists() {
    let (_sim, mut cell) = rig(params().samples);
    let mut console = ScriptedPort::new(" 2.0\r");
    let mut eeprom = MemEeprom::new(64);

    let out = run_setup(&mut cell, &mut console, &mut eeprom, params()).unwrap();

    assert!(out.persisted);
    assert_eq!(out.calibration, Calibration::new(25_000.0, ZERO as i32));
    assert_eq!(cell.scale(), 25_000.0);
    assert_eq!(cell.offset(), ZERO as i32);
    assert_eq!(
        persist::load(&mut eeprom, 0).unwrap(),
        Some(out.calibration)
    );
    assert!(console.transcript().contains("Settings saved to EEPROM."));
}

#[test]
fn malformed_and_non_positive_weights_are_reprompted() {
    let (_sim, mut cell) = rig(params().samples);
    let mut console = ScriptedPort::new("k1..5\r-2\r0\r4,0\r");
    let mut eeprom = MemEeprom::new(64);

    let out = run_setup(&mut cell, &mut console, &mut eeprom, params()).unwrap();

    assert_eq!(out.calibration.scale, 12_500.0);
    let transcript = console.transcript();
    assert!(transcript.contains("Invalid number: decimal separator entered twice."));
    assert_eq!(transcript.matches("Weight must be positive").count(), 2);
    assert_eq!(transcript.matches("Enter the weight, kg:").count(), 4);
}

#[test]
fn storage_failure_keeps_session_constants() {
    let (_sim, mut cell) = rig(params().samples);
    let mut console = ScriptedPort::new("x5\r");
    let mut too_small = MemEeprom::new(4);

    let out = run_setup(&mut cell, &mut console, &mut too_small, params()).unwrap();

    assert!(!out.persisted);
    assert_eq!(cell.scale(), 10_000.0);
    assert!(console.transcript().contains("ERROR saving settings to EEPROM."));
}

#[test]
fn unloaded_sensor_is_rejected_before_persisting() {
    let sim = SimHx711::new();
    sim.hold_reading(ZERO);
    let (dout, sck) = sim.pins();
    let mut cell = Hx711::new(dout, sck, Gain::A128).unwrap();
    let mut console = ScriptedPort::new("\r1\r");
    let mut eeprom = MemEeprom::new(64);

    let err = run_setup(&mut cell, &mut console, &mut eeprom, params()).unwrap_err();

    assert!(matches!(err.downcast_ref::<RigError>(), Some(RigError::State(_))));
    assert_eq!(eeprom.total_writes(), 0);
}

#[test]
fn operator_hanging_up_is_an_io_error() {
    let (_sim, mut cell) = rig(params().samples);
    let mut console = ScriptedPort::new("k");
    let mut eeprom = MemEeprom::new(64);

    let err = run_setup(&mut cell, &mut console, &mut eeprom, params()).unwrap_err();
    assert!(matches!(err.downcast_ref::<RigError>(), Some(RigError::Io(_))));
}
