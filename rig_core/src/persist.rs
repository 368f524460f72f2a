//! Calibration persistence on byte-addressable non-volatile storage.
//!
//! `save` only rewrites cells whose value changed, so re-saving an unchanged
//! calibration costs no EEPROM wear. `load` treats a checksum mismatch as
//! "no record" rather than an error; `preload` turns that into the fallback
//! constants.
use embedded_storage::{ReadStorage, Storage};
use rig_traits::LoadCell;
use tracing::{info, warn};

use crate::calibration::{Calibration, RECORD_LEN};
use crate::error::Result;
use crate::hw_error::map_storage_error;

/// Where the calibration in use came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preload {
    /// The stored record validated.
    Stored(Calibration),
    /// No trustworthy record; fallback constants installed.
    Defaults(Calibration),
}

impl Preload {
    pub fn calibration(&self) -> Calibration {
        match *self {
            Preload::Stored(c) | Preload::Defaults(c) => c,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Preload::Stored(_))
    }
}

/// Write `cal` at `base`, touching only bytes that differ from what is stored.
///
/// Returns how many bytes were physically written.
pub fn save<S>(storage: &mut S, base: u32, cal: &Calibration) -> Result<usize>
where
    S: Storage,
    S::Error: std::fmt::Debug,
{
    let record = cal.encode();
    let mut current = [0u8; RECORD_LEN];
    storage
        .read(base, &mut current)
        .map_err(map_storage_error)?;

    let mut written = 0;
    for (addr, (&new, &old)) in (base..).zip(record.iter().zip(current.iter())) {
        if new != old {
            storage.write(addr, &[new]).map_err(map_storage_error)?;
            written += 1;
        }
    }
    info!(
        scale = cal.scale,
        offset = cal.offset,
        written,
        "calibration saved"
    );
    Ok(written)
}

/// Read the record at `base`; `Ok(None)` when it fails its checksum.
pub fn load<S>(storage: &mut S, base: u32) -> Result<Option<Calibration>>
where
    S: ReadStorage,
    S::Error: std::fmt::Debug,
{
    let mut record = [0u8; RECORD_LEN];
    storage
        .read(base, &mut record)
        .map_err(map_storage_error)?;
    let cal = Calibration::decode(&record);
    if cal.is_none() {
        warn!(base, "calibration record failed checksum");
    }
    Ok(cal)
}

/// Apply the stored calibration to `cell`, or `defaults` when none validates.
pub fn preload<S, L>(storage: &mut S, base: u32, cell: &mut L, defaults: Calibration) -> Result<Preload>
where
    S: ReadStorage,
    S::Error: std::fmt::Debug,
    L: LoadCell + ?Sized,
{
    let outcome = match load(storage, base)? {
        Some(cal) => Preload::Stored(cal),
        None => {
            warn!(
                scale = defaults.scale,
                offset = defaults.offset,
                "using default calibration"
            );
            Preload::Defaults(defaults)
        }
    };
    outcome.calibration().apply(cell);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_hardware::eeprom::MemEeprom;

    #[test]
    fn first_save_writes_changed_bytes_second_writes_none() {
        let mut e = MemEeprom::new(64);
        let cal = Calibration::new(421.7, -5_000);
        // Cells already holding the erased value are skipped too.
        let differing = cal.encode().iter().filter(|&&b| b != 0xFF).count();
        assert_eq!(save(&mut e, 0, &cal).unwrap(), differing);
        assert_eq!(save(&mut e, 0, &cal).unwrap(), 0);
        assert_eq!(e.total_writes(), differing as u64);
    }

    #[test]
    fn changing_offset_only_rewrites_changed_cells() {
        let mut e = MemEeprom::new(64);
        save(&mut e, 0, &Calibration::new(2.0, 0x100)).unwrap();
        let written = save(&mut e, 0, &Calibration::new(2.0, 0x101)).unwrap();
        // scale bytes untouched
        for addr in 0..8 {
            assert_eq!(e.write_count(addr), 1, "scale byte {addr} rewritten");
        }
        assert!((1..=5).contains(&written));
    }

    #[test]
    fn load_after_save_round_trips() {
        let mut e = MemEeprom::new(64);
        let cal = Calibration::new(-0.001_25, -123_456);
        save(&mut e, 20, &cal).unwrap();
        assert_eq!(load(&mut e, 20).unwrap(), Some(cal));
    }

    #[test]
    fn corrupted_record_loads_as_absent() {
        let mut e = MemEeprom::new(64);
        save(&mut e, 0, &Calibration::new(3.0, 7)).unwrap();
        e.corrupt(9, 0x10);
        assert_eq!(load(&mut e, 0).unwrap(), None);
    }

    #[test]
    fn record_past_capacity_is_a_storage_error() {
        let mut e = MemEeprom::new(8);
        let err = load(&mut e, 0).expect_err("too small");
        assert!(err.to_string().contains("storage error"));
    }
}
