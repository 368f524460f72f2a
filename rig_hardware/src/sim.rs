//! Simulated peripherals for tests and the default CLI backend.
//!
//! - `SimHx711`: a wire-level HX711 that shifts queued 24-bit words out on
//!   DOUT as PD_SCK is clocked, counts pulses per transaction and records the
//!   gain selector the driver latched.
//! - `SimEdges`: an `EdgeInterrupt` whose falling edges are fired by hand.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use rig_traits::{BoxError, EdgeHandler, EdgeInterrupt};

use crate::hx711::DATA_BITS;

const WORD_MASK: u32 = 0x00FF_FFFF;
const SIGN_BIT: u32 = 0x0080_0000;

/// Wire word the device shifts out for a driver-visible raw code.
///
/// The driver flips the MSB after clocking, so encoding is the same flip.
#[inline]
pub fn encode(raw: u32) -> u32 {
    (raw & WORD_MASK) ^ SIGN_BIT
}

#[derive(Debug, Default)]
struct WireState {
    queue: VecDeque<u32>,
    steady: Option<u32>,
    not_ready: bool,
    clock_high: bool,
    shifting: Option<u32>,
    pulses: u8,
    latched_pulses: Option<u8>,
    rising_edges: u64,
    transactions: u64,
}

impl WireState {
    fn finish_transaction(&mut self) {
        if self.shifting.is_some() && u32::from(self.pulses) > DATA_BITS && !self.clock_high {
            self.latched_pulses = Some(self.pulses - DATA_BITS as u8);
            self.shifting = None;
            self.pulses = 0;
            self.transactions += 1;
        }
    }

    fn dout_high(&mut self) -> bool {
        self.finish_transaction();
        match self.shifting {
            Some(word) if self.pulses >= 1 && u32::from(self.pulses) <= DATA_BITS => {
                let shift = DATA_BITS - u32::from(self.pulses);
                (word >> shift) & 1 == 1
            }
            // Low while waiting for the first clock, high once past the data bits.
            Some(_) => self.pulses != 0,
            None => {
                if self.not_ready {
                    return true;
                }
                match self.queue.pop_front().or(self.steady) {
                    Some(word) => {
                        self.shifting = Some(word & WORD_MASK);
                        self.pulses = 0;
                        false
                    }
                    None => true,
                }
            }
        }
    }

    fn set_clock(&mut self, high: bool) {
        if high && !self.clock_high {
            self.rising_edges += 1;
            if self.shifting.is_some() {
                self.pulses = self.pulses.saturating_add(1);
            }
        }
        self.clock_high = high;
    }
}

/// Handle to a simulated HX711; clones share the device.
#[derive(Debug, Clone, Default)]
pub struct SimHx711 {
    wire: Rc<RefCell<WireState>>,
}

impl SimHx711 {
    pub fn new() -> Self {
        Self::default()
    }

    /// DOUT and PD_SCK pins wired to this device.
    pub fn pins(&self) -> (SimDout, SimSck) {
        (
            SimDout {
                wire: Rc::clone(&self.wire),
            },
            SimSck {
                wire: Rc::clone(&self.wire),
            },
        )
    }

    /// Queue a word exactly as it appears on the wire.
    pub fn push_word(&self, word: u32) {
        self.wire.borrow_mut().queue.push_back(word & WORD_MASK);
    }

    /// Queue a conversion the driver should decode as `raw`.
    pub fn push_reading(&self, raw: u32) {
        self.push_word(encode(raw));
    }

    /// Once the queue drains, keep answering with `raw`.
    pub fn hold_reading(&self, raw: u32) {
        self.wire.borrow_mut().steady = Some(encode(raw));
    }

    /// Force DOUT high, as a disconnected or dead device would.
    pub fn set_not_ready(&self, not_ready: bool) {
        self.wire.borrow_mut().not_ready = not_ready;
    }

    /// Every low-to-high transition seen on PD_SCK.
    pub fn rising_edges(&self) -> u64 {
        self.wire.borrow().rising_edges
    }

    /// Completed read transactions.
    pub fn transactions(&self) -> u64 {
        let mut wire = self.wire.borrow_mut();
        wire.finish_transaction();
        wire.transactions
    }

    /// Pulses after the 24 data bits of the last completed transaction.
    pub fn latched_gain_pulses(&self) -> Option<u8> {
        let mut wire = self.wire.borrow_mut();
        wire.finish_transaction();
        wire.latched_pulses
    }

    pub fn clock_is_high(&self) -> bool {
        self.wire.borrow().clock_high
    }
}

/// Simulated DOUT line.
#[derive(Debug)]
pub struct SimDout {
    wire: Rc<RefCell<WireState>>,
}

impl ErrorType for SimDout {
    type Error = Infallible;
}

impl InputPin for SimDout {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.wire.borrow_mut().dout_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.wire.borrow_mut().dout_high())
    }
}

/// Simulated PD_SCK line.
#[derive(Debug)]
pub struct SimSck {
    wire: Rc<RefCell<WireState>>,
}

impl ErrorType for SimSck {
    type Error = Infallible;
}

impl OutputPin for SimSck {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().set_clock(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().set_clock(true);
        Ok(())
    }
}

#[derive(Default)]
struct EdgeTable {
    handlers: Vec<(u8, EdgeHandler)>,
    refuse: bool,
}

/// Falling-edge source driven from test code.
#[derive(Clone, Default)]
pub struct SimEdges {
    table: Arc<Mutex<EdgeTable>>,
}

impl SimEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that rejects every registration.
    pub fn refusing() -> Self {
        let edges = Self::default();
        if let Ok(mut t) = edges.table.lock() {
            t.refuse = true;
        }
        edges
    }

    /// Deliver one falling edge on `pin`; returns how many handlers ran.
    pub fn fire(&self, pin: u8) -> usize {
        let Ok(mut t) = self.table.lock() else {
            return 0;
        };
        let mut ran = 0;
        for (p, handler) in t.handlers.iter_mut() {
            if *p == pin {
                handler();
                ran += 1;
            }
        }
        ran
    }

    pub fn is_attached(&self, pin: u8) -> bool {
        self.table
            .lock()
            .map(|t| t.handlers.iter().any(|(p, _)| *p == pin))
            .unwrap_or(false)
    }
}

impl EdgeInterrupt for SimEdges {
    fn attach_falling_edge(&mut self, pin: u8, handler: EdgeHandler) -> Result<(), BoxError> {
        let mut t = self
            .table
            .lock()
            .map_err(|_| BoxError::from("edge table poisoned"))?;
        if t.refuse {
            return Err(format!("no interrupt line for pin {pin}").into());
        }
        t.handlers.push((pin, handler));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_a_word_is_queued() {
        let sim = SimHx711::new();
        let (mut dout, _sck) = sim.pins();
        assert!(dout.is_high().unwrap());
        sim.push_word(0x12_3456);
        assert!(dout.is_low().unwrap());
    }

    #[test]
    fn shifts_msb_first_on_rising_edges() {
        let sim = SimHx711::new();
        let (mut dout, mut sck) = sim.pins();
        sim.push_word(0xA0_0001);
        assert!(dout.is_low().unwrap());
        let mut word = 0u32;
        for _ in 0..24 {
            sck.set_high().unwrap();
            word = (word << 1) | u32::from(dout.is_high().unwrap());
            sck.set_low().unwrap();
        }
        assert_eq!(word, 0xA0_0001);
        for _ in 0..2 {
            sck.set_high().unwrap();
            sck.set_low().unwrap();
        }
        assert_eq!(sim.latched_gain_pulses(), Some(2));
        assert_eq!(sim.transactions(), 1);
    }

    #[test]
    fn forced_not_ready_keeps_dout_high() {
        let sim = SimHx711::new();
        sim.hold_reading(1);
        sim.set_not_ready(true);
        let (mut dout, _sck) = sim.pins();
        assert!(dout.is_high().unwrap());
    }

    #[test]
    fn edges_reach_only_their_pin() {
        let mut edges = SimEdges::new();
        let hits = Arc::new(Mutex::new(0u32));
        let h = Arc::clone(&hits);
        edges
            .attach_falling_edge(
                17,
                Box::new(move || {
                    if let Ok(mut n) = h.lock() {
                        *n += 1;
                    }
                }),
            )
            .unwrap();
        assert!(edges.is_attached(17));
        assert_eq!(edges.fire(17), 1);
        assert_eq!(edges.fire(4), 0);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn refusing_source_reports_error() {
        let mut edges = SimEdges::refusing();
        let err = edges
            .attach_falling_edge(3, Box::new(|| {}))
            .expect_err("refused");
        assert!(err.to_string().contains("pin 3"));
    }
}
