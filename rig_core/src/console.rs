//! Operator console over a byte stream.
//!
//! Everything here is generic over `embedded-io`, so the same prompts run
//! on a UART, stdin/stdout or a scripted buffer in tests.
use embedded_io::{Read, ReadReady, Write};

use crate::error::{InputError, Result, RigError};

fn io_err<E: std::fmt::Debug>(e: E) -> RigError {
    RigError::Io(format!("{e:?}"))
}

/// Block until one byte arrives and return it.
///
/// End of stream is an error: there is nobody left to answer.
pub fn getch<P: Read + ?Sized>(port: &mut P) -> Result<u8> {
    let mut b = [0u8; 1];
    match port.read(&mut b).map_err(io_err)? {
        0 => Err(RigError::Io("end of input".into()).into()),
        _ => Ok(b[0]),
    }
}

/// Whether a byte is waiting, without consuming it.
pub fn kbhit<P: ReadReady + ?Sized>(port: &mut P) -> Result<bool> {
    let ready = port.read_ready().map_err(io_err)?;
    Ok(ready)
}

pub fn write_str<P: Write + ?Sized>(port: &mut P, s: &str) -> Result<()> {
    port.write_all(s.as_bytes()).map_err(io_err)?;
    port.flush().map_err(io_err)?;
    Ok(())
}

pub fn write_line<P: Write + ?Sized>(port: &mut P, s: &str) -> Result<()> {
    port.write_all(s.as_bytes()).map_err(io_err)?;
    write_str(port, "\r\n")
}

#[inline]
fn is_eol(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

/// Accumulates one decimal entry.
#[derive(Debug, Default)]
struct NumberEntry {
    integer: f64,
    frac: f64,
    weight: f64,
    point: bool,
    negative: bool,
    digits: bool,
}

impl NumberEntry {
    fn new() -> Self {
        Self {
            weight: 0.1,
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        !self.digits && !self.point && !self.negative
    }

    fn push(&mut self, b: u8) -> std::result::Result<(), InputError> {
        match b {
            b'0'..=b'9' => {
                let d = f64::from(b - b'0');
                if self.point {
                    self.frac += d * self.weight;
                    self.weight *= 0.1;
                } else {
                    self.integer = self.integer * 10.0 + d;
                }
                self.digits = true;
                Ok(())
            }
            b'.' | b',' if self.point => Err(InputError::RepeatedSeparator),
            b'.' | b',' => {
                self.point = true;
                Ok(())
            }
            b'-' if self.digits || self.point || self.negative => Err(InputError::MisplacedSign),
            b'-' => {
                self.negative = true;
                Ok(())
            }
            other => Err(InputError::Unexpected(other)),
        }
    }

    fn value(&self) -> f64 {
        let v = self.integer + self.frac;
        if self.negative { -v } else { v }
    }
}

/// Read a decimal number terminated by CR or LF, echoing every byte.
///
/// Accepts digits, one `.` or `,` separator and a leading `-`. An entry with
/// no digits reads as 0. Line terminators before the first character are
/// skipped. On a malformed entry the rest of the line is consumed and the
/// error is returned as `RigError::Input`.
pub fn scan_f64<P: Read + Write + ?Sized>(port: &mut P) -> Result<f64> {
    let mut entry = NumberEntry::new();
    loop {
        let b = getch(port)?;
        port.write_all(&[b]).map_err(io_err)?;
        if is_eol(b) {
            if entry.is_empty() {
                continue;
            }
            return Ok(entry.value());
        }
        if let Err(e) = entry.push(b) {
            drain_line(port)?;
            return Err(RigError::Input(e).into());
        }
    }
}

fn drain_line<P: Read + Write + ?Sized>(port: &mut P) -> Result<()> {
    loop {
        let b = getch(port)?;
        port.write_all(&[b]).map_err(io_err)?;
        if is_eol(b) {
            return Ok(());
        }
    }
}
