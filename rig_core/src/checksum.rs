//! CRC-32 integrity check for persisted payloads.
//!
//! A sealed buffer is `payload ++ crc32(payload)` with the checksum stored
//! little-endian in the last `WIDTH` bytes.
use crc::{CRC_32_ISO_HDLC, Crc};

/// Checksum width in bytes.
pub const WIDTH: usize = 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32 (ISO-HDLC) of `bytes`.
#[inline]
pub fn compute(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Append the checksum of `payload`.
pub fn seal(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + WIDTH);
    out.extend_from_slice(payload);
    out.extend_from_slice(&compute(payload).to_le_bytes());
    out
}

/// Recompute over everything but the trailing checksum and compare.
///
/// Buffers shorter than the checksum never verify.
pub fn verify(bytes: &[u8]) -> bool {
    let Some(split) = bytes.len().checked_sub(WIDTH) else {
        return false;
    };
    let (payload, tail) = bytes.split_at(split);
    let mut stored = [0u8; WIDTH];
    stored.copy_from_slice(tail);
    compute(payload) == u32::from_le_bytes(stored)
}
