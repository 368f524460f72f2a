use thiserror::Error;

/// Why a numeric entry on the console was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("decimal separator entered twice")]
    RepeatedSeparator,
    #[error("sign must come before any digit")]
    MisplacedSign,
    #[error("unexpected byte 0x{0:02x}")]
    Unexpected(u8),
}

#[derive(Debug, Error, Clone)]
pub enum RigError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
