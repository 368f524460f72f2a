//! `embedded-io` view of the process's stdin/stdout, for the calibration dialogue.

use embedded_io::{ErrorType, Read, Write};
use std::io::{Read as _, Write as _};

#[derive(Debug, Default)]
pub struct StdConsole;

impl ErrorType for StdConsole {
    type Error = std::io::Error;
}

impl Read for StdConsole {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // One byte at a time so every keystroke is echoed as it arrives.
        let n = buf.len().min(1);
        std::io::stdin().lock().read(&mut buf[..n])
    }
}

impl Write for StdConsole {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::stdout().lock().write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::stdout().lock().flush()
    }
}
