//! Pulse-timing capture for a hall-effect rotation sensor.
//!
//! One falling edge per revolution. The edge handler runs asynchronously to
//! everything else (an interrupt thread on Linux), so the shared state is a
//! set of atomics with a single writer: the handler. Readers may observe the
//! pulse count and the filtered speed from slightly different edges, never a
//! torn value.
//!
//! Lifecycle: `NotStarted -> Running`. There is no stop; dropping the edge
//! source detaches the handler.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rig_traits::{Clock, EdgeInterrupt};
use tracing::{info, trace};

use crate::config::RotationParams;
use crate::error::Result;
use crate::filter::low_pass;
use crate::hw_error::map_hw_error;
use crate::util::{ms_to_secs, rpm_from_interval_ms};

/// State mutated by the edge handler.
#[derive(Debug, Default)]
pub struct RotationState {
    last_edge_ms: AtomicU64,
    previous_edge_ms: AtomicU64,
    pulses: AtomicU64,
    speed_bits: AtomicU64,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counters and pin both edge timestamps to `now_ms`.
    pub fn reset(&self, now_ms: u64) {
        self.pulses.store(0, Ordering::Relaxed);
        self.speed_bits.store(0.0f64.to_bits(), Ordering::Relaxed);
        self.previous_edge_ms.store(now_ms, Ordering::Relaxed);
        self.last_edge_ms.store(now_ms, Ordering::Release);
    }

    /// Account for one falling edge seen at `now_ms`.
    ///
    /// Edges closer than the debounce window to the last accepted edge are
    /// dropped without touching any state. Returns whether the edge counted.
    pub fn on_falling_edge(&self, now_ms: u64, params: &RotationParams) -> bool {
        let last = self.last_edge_ms.load(Ordering::Acquire);
        let dt_ms = now_ms.saturating_sub(last);
        if dt_ms < params.debounce_ms.max(1) {
            return false;
        }

        self.pulses.fetch_add(1, Ordering::Relaxed);
        self.previous_edge_ms.store(last, Ordering::Relaxed);
        self.last_edge_ms.store(now_ms, Ordering::Release);

        let rpm = rpm_from_interval_ms(dt_ms);
        let prev = f64::from_bits(self.speed_bits.load(Ordering::Relaxed));
        let filtered = low_pass(rpm, prev, ms_to_secs(dt_ms), params.time_constant_s);
        self.speed_bits.store(filtered.to_bits(), Ordering::Release);

        trace!(dt_ms, rpm, filtered, "edge");
        true
    }

    /// Low-pass filtered speed in rotations per minute.
    pub fn speed(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::Acquire))
    }

    /// Accepted edges since start.
    pub fn rotates(&self) -> u64 {
        self.pulses.load(Ordering::Acquire)
    }

    pub fn last_edge_ms(&self) -> u64 {
        self.last_edge_ms.load(Ordering::Acquire)
    }

    pub fn previous_edge_ms(&self) -> u64 {
        self.previous_edge_ms.load(Ordering::Acquire)
    }
}

/// Owns the capture context handed to the edge handler.
pub struct RotationSensor<C: Clock + Clone + Send + 'static> {
    pin: u8,
    clock: C,
    epoch: Instant,
    params: RotationParams,
    state: Arc<RotationState>,
    started: bool,
}

impl<C: Clock + Clone + Send + 'static> RotationSensor<C> {
    pub fn new(pin: u8, clock: C, params: RotationParams) -> Self {
        let epoch = clock.now();
        Self {
            pin,
            clock,
            epoch,
            params,
            state: Arc::new(RotationState::new()),
            started: false,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Reassign the sensor pin. Refused (returns `false`) once running.
    pub fn set_pin(&mut self, pin: u8) -> bool {
        if self.started {
            return false;
        }
        self.pin = pin;
        true
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn params(&self) -> RotationParams {
        self.params
    }

    /// Register the edge handler and begin counting.
    ///
    /// Returns `Ok(false)` without side effects when already running. A
    /// registration failure leaves the sensor stopped.
    pub fn start<E: EdgeInterrupt + ?Sized>(&mut self, irq: &mut E) -> Result<bool> {
        if self.started {
            return Ok(false);
        }

        self.state.reset(self.clock.ms_since(self.epoch));

        let state = Arc::clone(&self.state);
        let clock = self.clock.clone();
        let epoch = self.epoch;
        let params = self.params;
        irq.attach_falling_edge(
            self.pin,
            Box::new(move || {
                state.on_falling_edge(clock.ms_since(epoch), &params);
            }),
        )
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;

        self.started = true;
        info!(pin = self.pin, debounce_ms = self.params.debounce_ms, "rotation sensor started");
        Ok(true)
    }

    pub fn speed(&self) -> f64 {
        self.state.speed()
    }

    pub fn rotates(&self) -> u64 {
        self.state.rotates()
    }

    /// Shared handle to the capture state.
    pub fn state(&self) -> Arc<RotationState> {
        Arc::clone(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RotationParams {
        RotationParams::default()
    }

    #[test]
    fn edge_inside_debounce_window_is_ignored() {
        let s = RotationState::new();
        s.reset(100);
        assert!(!s.on_falling_edge(100, &params()));
        assert_eq!(s.rotates(), 0);
        assert_eq!(s.last_edge_ms(), 100);
    }

    #[test]
    fn accepted_edge_shifts_timestamps() {
        let s = RotationState::new();
        s.reset(0);
        assert!(s.on_falling_edge(500, &params()));
        assert!(s.on_falling_edge(1_500, &params()));
        assert_eq!(s.previous_edge_ms(), 500);
        assert_eq!(s.last_edge_ms(), 1_500);
        assert_eq!(s.rotates(), 2);
    }

    #[test]
    fn speed_is_filtered_instantaneous_rpm() {
        let s = RotationState::new();
        s.reset(0);
        s.on_falling_edge(1_000, &params());
        // 60 rpm, a = 1.0 / 2.0
        assert!((s.speed() - 30.0).abs() < 1e-9);
        s.on_falling_edge(2_000, &params());
        assert!((s.speed() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn zero_debounce_behaves_as_one_ms() {
        let p = RotationParams {
            debounce_ms: 0,
            ..params()
        };
        let s = RotationState::new();
        s.reset(10);
        assert!(!s.on_falling_edge(10, &p));
        assert!(s.on_falling_edge(11, &p));
    }
}
