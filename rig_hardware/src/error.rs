use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("unsupported hx711 gain {0} (expected 128, 64 or 32)")]
    UnsupportedGain(u8),
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("interrupt registration failed: {0}")]
    Interrupt(String),
    #[error("eeprom error: {0}")]
    Storage(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
