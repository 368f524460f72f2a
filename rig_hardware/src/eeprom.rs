//! Byte-addressable non-volatile storage backends.
//!
//! Both implement `embedded_storage::Storage`. `MemEeprom` keeps the image in
//! memory and counts writes per address so wear can be checked; `FileEeprom`
//! mirrors the image to a file and replaces it atomically on every write.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use embedded_storage::{ReadStorage, Storage};
use tracing::debug;

use crate::error::{HwError, Result};

/// Value of a never-written EEPROM cell.
pub const ERASED: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct MemEeprom {
    bytes: Vec<u8>,
    writes: Vec<u32>,
}

impl MemEeprom {
    pub fn new(capacity: usize) -> Self {
        Self::from_image(vec![ERASED; capacity])
    }

    pub fn from_image(bytes: Vec<u8>) -> Self {
        let writes = vec![0; bytes.len()];
        Self { bytes, writes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Times the cell at `addr` has been written.
    pub fn write_count(&self, addr: usize) -> u32 {
        self.writes.get(addr).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> u64 {
        self.writes.iter().map(|&w| u64::from(w)).sum()
    }

    /// Flip bits in a stored byte without counting it as a write.
    pub fn corrupt(&mut self, addr: usize, mask: u8) {
        if let Some(b) = self.bytes.get_mut(addr) {
            *b ^= mask;
        }
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                HwError::Storage(format!(
                    "access {start}..{} outside capacity {}",
                    start.saturating_add(len),
                    self.bytes.len()
                ))
            })?;
        Ok(start..end)
    }
}

impl ReadStorage for MemEeprom {
    type Error = HwError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<()> {
        let r = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[r]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for MemEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let r = self.range(offset, bytes.len())?;
        for w in &mut self.writes[r.clone()] {
            *w = w.saturating_add(1);
        }
        self.bytes[r].copy_from_slice(bytes);
        Ok(())
    }
}

/// EEPROM image persisted in a file.
///
/// A missing file reads as erased; a short file is padded with erased cells.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    image: MemEeprom,
}

impl FileEeprom {
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        bytes.resize(capacity, ERASED);
        debug!(path = %path.display(), capacity, "eeprom image opened");
        Ok(Self {
            path,
            image: MemEeprom::from_image(bytes),
        })
    }

}

impl ReadStorage for FileEeprom {
    type Error = HwError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<()> {
        self.image.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.image.capacity()
    }
}

impl Storage for FileEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        self.image.write(offset, bytes)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        write_atomic(&self.path, self.image.bytes())?;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_image_is_erased() {
        let mut e = MemEeprom::new(8);
        let mut buf = [0u8; 8];
        e.read(0, &mut buf).unwrap();
        assert_eq!(buf, [ERASED; 8]);
        assert_eq!(e.capacity(), 8);
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut e = MemEeprom::new(4);
        let mut buf = [0u8; 2];
        assert!(e.read(3, &mut buf).is_err());
        assert!(e.write(4, &[1]).is_err());
        assert_eq!(e.total_writes(), 0);
    }

    #[test]
    fn writes_are_counted_per_cell() {
        let mut e = MemEeprom::new(4);
        e.write(1, &[7, 8]).unwrap();
        e.write(2, &[9]).unwrap();
        assert_eq!(e.write_count(0), 0);
        assert_eq!(e.write_count(1), 1);
        assert_eq!(e.write_count(2), 2);
        assert_eq!(e.bytes(), &[ERASED, 7, 9, ERASED]);
    }

    #[test]
    fn corrupt_does_not_count_as_write() {
        let mut e = MemEeprom::new(2);
        e.corrupt(0, 0x01);
        assert_eq!(e.bytes()[0], 0xFE);
        assert_eq!(e.total_writes(), 0);
    }

    #[test]
    fn file_image_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("eeprom.bin");
        {
            let mut e = FileEeprom::open(&path, 16).unwrap();
            e.write(3, &[0xAB, 0xCD]).unwrap();
        }
        let mut e = FileEeprom::open(&path, 16).unwrap();
        let mut buf = [0u8; 2];
        e.read(3, &mut buf).unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(fs::read(&path).unwrap().len(), 16);
    }
}
