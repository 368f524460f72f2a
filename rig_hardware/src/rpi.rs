//! Raspberry Pi GPIO through `rppal`.
use rig_traits::{BoxError, EdgeHandler, EdgeInterrupt};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use tracing::info;

use crate::error::{HwError, Result};
use crate::hx711::{Gain, Hx711};
use crate::util::ReadyPolicy;

pub type RpiHx711 = Hx711<InputPin, OutputPin>;

/// Claim the DOUT/PD_SCK pins and bring up the HX711.
pub fn open_hx711(dt_pin: u8, sck_pin: u8, gain: Gain, policy: ReadyPolicy) -> Result<RpiHx711> {
    let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open hx711: {e}")))?;
    let dout = gpio
        .get(dt_pin)
        .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
        .into_input();
    let sck = gpio
        .get(sck_pin)
        .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
        .into_output_low();
    info!(dt_pin, sck_pin, gain = gain.factor(), "hx711 pins claimed");
    Hx711::new_with_policy(dout, sck, gain, policy)
}

/// Falling-edge interrupts on pulled-up inputs.
///
/// Claimed pins are kept here; dropping `RpiEdges` clears their interrupts.
pub struct RpiEdges {
    gpio: Gpio,
    pins: Vec<InputPin>,
}

impl RpiEdges {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        Ok(Self {
            gpio,
            pins: Vec::new(),
        })
    }
}

impl EdgeInterrupt for RpiEdges {
    fn attach_falling_edge(
        &mut self,
        pin: u8,
        mut handler: EdgeHandler,
    ) -> std::result::Result<(), BoxError> {
        let mut input = self
            .gpio
            .get(pin)
            .map_err(|e| HwError::Interrupt(format!("pin {pin}: {e}")))?
            .into_input_pullup();
        input
            .set_async_interrupt(Trigger::FallingEdge, move |_level| handler())
            .map_err(|e| HwError::Interrupt(format!("pin {pin}: {e}")))?;
        self.pins.push(input);
        Ok(())
    }
}
