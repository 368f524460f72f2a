//! Calibration model and its persisted record.
//!
//! units = (raw - offset) / scale
//!
//! Record layout (little-endian, `RECORD_LEN` bytes):
//!
//! | bytes    | field                          |
//! |----------|--------------------------------|
//! | `0..8`   | scale, IEEE-754 f64 bit pattern |
//! | `8..12`  | offset, i32                    |
//! | `12..16` | CRC-32 of bytes `0..12`        |
use rig_traits::LoadCell;

use crate::checksum;

/// Scale installed when no trustworthy record exists.
pub const DEFAULT_SCALE: f64 = 93_723.34;
/// Zero-load raw code installed when no trustworthy record exists.
pub const DEFAULT_OFFSET: i32 = 0x7E_AE6E;

const SCALE_BYTES: usize = 8;
const OFFSET_BYTES: usize = 4;
const PAYLOAD_LEN: usize = SCALE_BYTES + OFFSET_BYTES;

/// Persisted record length in bytes.
pub const RECORD_LEN: usize = PAYLOAD_LEN + checksum::WIDTH;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw codes per physical unit.
    pub scale: f64,
    /// Raw code at zero load.
    pub offset: i32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Calibration {
    pub fn new(scale: f64, offset: i32) -> Self {
        Self { scale, offset }
    }

    /// A scale that can be divided by.
    pub fn is_usable(&self) -> bool {
        self.scale.is_finite() && self.scale != 0.0
    }

    /// Snapshot of what a load cell currently uses.
    pub fn from_cell<L: LoadCell + ?Sized>(cell: &L) -> Self {
        Self {
            scale: cell.scale(),
            offset: cell.offset(),
        }
    }

    /// Install scale and offset on a load cell.
    pub fn apply<L: LoadCell + ?Sized>(&self, cell: &mut L) {
        cell.set_scale(self.scale);
        cell.set_offset(self.offset);
    }

    /// Serialize to the fixed record, checksum included.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..SCALE_BYTES].copy_from_slice(&self.scale.to_bits().to_le_bytes());
        payload[SCALE_BYTES..].copy_from_slice(&self.offset.to_le_bytes());
        let mut out = [0u8; RECORD_LEN];
        out.copy_from_slice(&checksum::seal(&payload));
        out
    }

    /// Parse a record; `None` when the checksum does not match.
    pub fn decode(record: &[u8; RECORD_LEN]) -> Option<Self> {
        if !checksum::verify(record) {
            return None;
        }
        let mut scale = [0u8; SCALE_BYTES];
        scale.copy_from_slice(&record[..SCALE_BYTES]);
        let mut offset = [0u8; OFFSET_BYTES];
        offset.copy_from_slice(&record[SCALE_BYTES..PAYLOAD_LEN]);
        Some(Self {
            scale: f64::from_bits(u64::from_le_bytes(scale)),
            offset: i32::from_le_bytes(offset),
        })
    }
}
