//! Peripheral drivers and backends: the HX711 bit-protocol driver, EEPROM
//! images, simulated devices, and (feature `hardware`) Raspberry Pi GPIO.
pub mod eeprom;
pub mod error;
pub mod hx711;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

pub use eeprom::{FileEeprom, MemEeprom};
pub use hx711::{Gain, Hx711};
pub use util::ReadyPolicy;
