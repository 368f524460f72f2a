//! Bit-banged HX711 24-bit load-cell ADC.
//!
//! One transaction is 24 data clocks, MSB first, followed by 1..=3 extra
//! clocks that select channel and gain for the *next* conversion. The data
//! line idles high while a conversion is in progress and drops low when a
//! result is ready.
use std::fmt::Debug;

use embedded_hal::digital::{InputPin, OutputPin};
use rig_traits::{BoxError, LoadCell};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{ReadyPolicy, wait_until_low};

/// Channel/gain selection, latched by the device after a full read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128.
    #[default]
    A128,
    /// Channel A, gain 64.
    A64,
    /// Channel B, gain 32.
    B32,
}

impl Gain {
    /// Extra clock pulses appended after the 24 data bits.
    #[inline]
    pub const fn pulses(self) -> u8 {
        match self {
            Gain::A128 => 1,
            Gain::A64 => 3,
            Gain::B32 => 2,
        }
    }

    #[inline]
    pub const fn factor(self) -> u8 {
        match self {
            Gain::A128 => 128,
            Gain::A64 => 64,
            Gain::B32 => 32,
        }
    }
}

impl TryFrom<u8> for Gain {
    type Error = HwError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            128 => Ok(Gain::A128),
            64 => Ok(Gain::A64),
            32 => Ok(Gain::B32),
            other => Err(HwError::UnsupportedGain(other)),
        }
    }
}

/// Data bits per conversion.
pub const DATA_BITS: u32 = 24;

/// HX711 driver owning its DOUT/PD_SCK pin pair.
///
/// `scale` is raw codes per physical unit, `offset` the raw code read at zero
/// load. Neither is validated: a zero scale turns every unit conversion into
/// an infinity or NaN, so callers check before trusting it.
pub struct Hx711<D, K> {
    dout: D,
    pd_sck: K,
    gain: Gain,
    scale: f64,
    offset: i32,
    last: i32,
    policy: ReadyPolicy,
}

impl<D, K> Hx711<D, K>
where
    D: InputPin,
    K: OutputPin,
{
    /// Take ownership of the pins and latch `gain` with one blocking read.
    pub fn new(dout: D, pd_sck: K, gain: Gain) -> Result<Self> {
        Self::new_with_policy(dout, pd_sck, gain, ReadyPolicy::Blocking)
    }

    /// Like `new`, with an explicit bound on the data-ready wait.
    pub fn new_with_policy(dout: D, pd_sck: K, gain: Gain, policy: ReadyPolicy) -> Result<Self> {
        let mut hx = Self {
            dout,
            pd_sck,
            gain,
            scale: 1.0,
            offset: 0,
            last: 0,
            policy,
        };
        hx.set_gain(gain)?;
        Ok(hx)
    }

    /// True when DOUT is low, i.e. a conversion is waiting to be clocked out.
    pub fn is_ready(&mut self) -> Result<bool> {
        self.dout.is_low().map_err(gpio_err)
    }

    /// Select gain for the next conversion and apply it right away.
    ///
    /// The device only latches the selector after a complete read cycle, so
    /// this performs one `read()` whose result is discarded.
    pub fn set_gain(&mut self, gain: Gain) -> Result<()> {
        self.gain = gain;
        self.pd_sck.set_low().map_err(gpio_err)?;
        let raw = self.read()?;
        debug!(gain = gain.factor(), raw, "hx711 gain latched");
        Ok(())
    }

    #[inline]
    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn set_ready_policy(&mut self, policy: ReadyPolicy) {
        self.policy = policy;
    }

    /// Clock out one conversion.
    ///
    /// Waits for DOUT to go low under the configured `ReadyPolicy`, then
    /// shifts 24 bits MSB first and emits the gain pulses. The sign bit is
    /// flipped so the two's-complement code becomes an offset-binary value in
    /// `0..=0xFF_FFFF`, which is stored as the last reading and returned.
    pub fn read(&mut self) -> Result<i32> {
        let policy = self.policy;
        wait_until_low(|| self.is_ready().map(|ready| !ready), policy)?;

        let mut data = [0u8; 3];
        for byte in &mut data {
            for _ in 0..8 {
                self.pd_sck.set_high().map_err(gpio_err)?;
                spin_delay_100ns();
                let bit = self.dout.is_high().map_err(gpio_err)?;
                *byte = (*byte << 1) | u8::from(bit);
                self.pd_sck.set_low().map_err(gpio_err)?;
                spin_delay_100ns();
            }
        }

        // Selects channel and gain for the next conversion; must follow the
        // data clocks before DOUT is polled again.
        for _ in 0..self.gain.pulses() {
            self.pd_sck.set_high().map_err(gpio_err)?;
            spin_delay_100ns();
            self.pd_sck.set_low().map_err(gpio_err)?;
            spin_delay_100ns();
        }

        data[0] ^= 0x80;
        let raw = (i32::from(data[0]) << 16) | (i32::from(data[1]) << 8) | i32::from(data[2]);
        self.last = raw;
        trace!(raw, "hx711 raw read");
        Ok(raw)
    }

    /// Truncating mean of `times` reads (0 is treated as 1).
    ///
    /// The mean replaces the last raw reading, so `last_units()` afterwards
    /// converts the average rather than the final sample.
    pub fn read_average(&mut self, times: u8) -> Result<i32> {
        let n = times.max(1);
        let mut sum: i64 = 0;
        for _ in 0..n {
            sum += i64::from(self.read()?);
        }
        // Mean of 24-bit codes always fits.
        let avg = i32::try_from(sum / i64::from(n)).unwrap_or(i32::MAX);
        self.last = avg;
        debug!(samples = n, avg, "hx711 averaged read");
        Ok(avg)
    }

    /// `read_average(times) - offset`, widened so any offset fits.
    pub fn value(&mut self, times: u8) -> Result<i64> {
        let avg = self.read_average(times)?;
        Ok(i64::from(avg) - i64::from(self.offset))
    }

    /// `value(times) / scale`.
    pub fn units(&mut self, times: u8) -> Result<f64> {
        let avg = self.read_average(times)?;
        Ok(self.to_units(avg))
    }

    /// Convert the stored last reading without touching the wire.
    pub fn last_units(&self) -> f64 {
        self.to_units(self.last)
    }

    // Both operands are exact in f64, so this equals value / scale.
    fn to_units(&self, raw: i32) -> f64 {
        (f64::from(raw) - f64::from(self.offset)) / self.scale
    }

    /// Raw code (or averaged code) from the most recent read.
    #[inline]
    pub fn last_raw(&self) -> i32 {
        self.last
    }

    /// Define the present load as zero.
    pub fn tare(&mut self, times: u8) -> Result<i32> {
        let offset = self.read_average(times)?;
        self.set_offset(offset);
        debug!(offset, "hx711 tared");
        Ok(offset)
    }

    #[inline]
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    #[inline]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Enter low-power mode: PD_SCK low then held high (>60 us powers down).
    pub fn power_down(&mut self) -> Result<()> {
        self.pd_sck.set_low().map_err(gpio_err)?;
        self.pd_sck.set_high().map_err(gpio_err)
    }

    /// Wake the device; the next conversion uses channel A, gain 128.
    pub fn power_up(&mut self) -> Result<()> {
        self.pd_sck.set_low().map_err(gpio_err)
    }

    /// Give the pins back.
    pub fn release(self) -> (D, K) {
        (self.dout, self.pd_sck)
    }
}

impl<D, K> LoadCell for Hx711<D, K>
where
    D: InputPin,
    K: OutputPin,
{
    fn tare(&mut self, times: u8) -> std::result::Result<i32, BoxError> {
        Ok(Hx711::tare(self, times)?)
    }

    fn units(&mut self, times: u8) -> std::result::Result<f64, BoxError> {
        Ok(Hx711::units(self, times)?)
    }

    fn set_scale(&mut self, scale: f64) {
        Hx711::set_scale(self, scale);
    }

    fn scale(&self) -> f64 {
        Hx711::scale(self)
    }

    fn set_offset(&mut self, offset: i32) {
        Hx711::set_offset(self, offset);
    }

    fn offset(&self) -> i32 {
        Hx711::offset(self)
    }
}

fn gpio_err<E: Debug>(e: E) -> HwError {
    HwError::Gpio(format!("{e:?}"))
}

#[inline(always)]
fn spin_delay_100ns() {
    // A few CPU cycles; the HX711 needs only 0.1 us per clock phase.
    std::hint::spin_loop();
}
