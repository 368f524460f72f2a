//! Calibration persistence against simulated and file-backed EEPROM.
//!
//! Verifies that:
//! - A saved record loads back bit-exactly
//! - Re-saving unchanged constants costs no writes
//! - Corrupted or erased storage falls back to the configured defaults

use rig_core::calibration::{Calibration, RECORD_LEN};
use rig_core::persist::{self, Preload};
use rig_hardware::eeprom::{FileEeprom, MemEeprom};
use rig_hardware::hx711::{Gain, Hx711};
use rig_hardware::sim::SimHx711;
use rig_traits::LoadCell;
use rstest::rstest;

fn sim_cell() -> Hx711<rig_hardware::sim::SimDout, rig_hardware::sim::SimSck> {
    let sim = SimHx711::new();
    sim.hold_reading(0);
    let (dout, sck) = sim.pins();
    Hx711::new(dout, sck, Gain::A128).unwrap()
}

#[rstest]
#[case(1.0, 0)]
#[case(93_723.34, 0x7E_AE6E)]
#[case(0.015_625, -1)]
#[case(-412.75, -8_388_608)]
#[case(1.0e-9, 16_777_215)]
fn save_then_load_is_bit_exact(#[case] scale: f64, #[case] offset: i32) {
    let mut e = MemEeprom::new(256);
    let cal = Calibration::new(scale, offset);
    persist::save(&mut e, 32, &cal).unwrap();
    let back = persist::load(&mut e, 32).unwrap().expect("valid record");
    assert_eq!(back.scale.to_bits(), scale.to_bits());
    assert_eq!(back.offset, offset);
}

#[test]
fn resave_of_same_constants_writes_nothing() {
    let mut e = MemEeprom::new(64);
    let cal = Calibration::new(250.5, 123);
    persist::save(&mut e, 0, &cal).unwrap();
    let before = e.total_writes();
    for _ in 0..100 {
        assert_eq!(persist::save(&mut e, 0, &cal).unwrap(), 0);
    }
    assert_eq!(e.total_writes(), before);
}

#[test]
fn erased_storage_preloads_defaults() {
    let mut e = MemEeprom::new(64);
    let mut cell = sim_cell();
    let defaults = Calibration::default();
    let got = persist::preload(&mut e, 0, &mut cell, defaults).unwrap();
    assert_eq!(got, Preload::Defaults(defaults));
    assert!(!got.is_stored());
    assert_eq!(cell.scale(), 93_723.34);
    assert_eq!(cell.offset(), 0x7E_AE6E);
}

#[test]
fn every_single_bit_flip_falls_back_to_defaults() {
    let cal = Calibration::new(7.25, -99);
    for byte in 0..RECORD_LEN {
        for bit in 0..8 {
            let mut e = MemEeprom::new(RECORD_LEN);
            persist::save(&mut e, 0, &cal).unwrap();
            e.corrupt(byte, 1 << bit);
            let mut cell = sim_cell();
            let got = persist::preload(&mut e, 0, &mut cell, Calibration::default()).unwrap();
            assert!(!got.is_stored(), "flip at byte {byte} bit {bit} went unnoticed");
        }
    }
}

#[test]
fn stored_record_is_applied_to_the_cell() {
    let mut e = MemEeprom::new(64);
    let cal = Calibration::new(-2_000.0, 4_096);
    persist::save(&mut e, 8, &cal).unwrap();
    let mut cell = sim_cell();
    let got = persist::preload(&mut e, 8, &mut cell, Calibration::default()).unwrap();
    assert_eq!(got, Preload::Stored(cal));
    assert_eq!(Calibration::from_cell(&cell), cal);
}

#[test]
fn file_eeprom_keeps_record_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nv").join("eeprom.bin");
    let cal = Calibration::new(93_000.5, 8_300_000);
    {
        let mut e = FileEeprom::open(&path, 128).unwrap();
        persist::save(&mut e, 0, &cal).unwrap();
    }
    let mut e = FileEeprom::open(&path, 128).unwrap();
    assert_eq!(persist::load(&mut e, 0).unwrap(), Some(cal));
}
