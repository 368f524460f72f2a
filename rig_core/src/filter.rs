//! Recursive smoothing filters.
//!
//! `low_pass` is a first-order lag `W(p) = 1 / (T p + 1)` discretized with the
//! rectangle rule; callers thread the previous output through. The moving
//! average works over a caller-owned window, newest sample first.

/// One step of exponential smoothing.
///
/// `a = dt / time_constant`, output `a * x + (1 - a) * prev`. Nothing clamps
/// `a`: with `dt > time_constant` the step overshoots, which is how the
/// discretization behaves.
#[inline]
pub fn low_pass(x: f64, prev: f64, dt: f64, time_constant: f64) -> f64 {
    let a = dt / time_constant;
    let b = 1.0 - a;
    a * x + b * prev
}

/// Fill every slot of `window` with `init`.
#[inline]
pub fn seed(window: &mut [f64], init: f64) {
    window.fill(init);
}

/// Shift `x` into the front of `window` and return the mean of the window.
///
/// An empty window has nothing to average and returns `x` unchanged.
pub fn moving_average(x: f64, window: &mut [f64]) -> f64 {
    if window.is_empty() {
        return x;
    }
    window.rotate_right(1);
    window[0] = x;
    window.iter().sum::<f64>() / window.len() as f64
}

/// Owned moving-average window.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: Box<[f64]>,
}

impl MovingAverage {
    /// Window of `size` samples (at least one), pre-filled with `init`.
    pub fn new(size: usize, init: f64) -> Self {
        Self {
            window: vec![init; size.max(1)].into_boxed_slice(),
        }
    }

    /// Refill the window, e.g. after a tare.
    pub fn reset(&mut self, init: f64) {
        seed(&mut self.window, init);
    }

    pub fn push(&mut self, x: f64) -> f64 {
        moving_average(x, &mut self.window)
    }

    pub fn mean(&self) -> f64 {
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn low_pass_weights_by_dt_over_t() {
        // a = 0.5
        assert_eq!(low_pass(10.0, 0.0, 1.0, 2.0), 5.0);
        // a = 1 jumps straight to the input
        assert_eq!(low_pass(7.0, 100.0, 2.0, 2.0), 7.0);
        // dt = 0 holds the previous output
        assert_eq!(low_pass(7.0, 3.0, 0.0, 2.0), 3.0);
    }

    #[test]
    fn seeded_window_reads_back_seed() {
        let mut w = [0.0; 5];
        seed(&mut w, 4.0);
        assert_eq!(w, [4.0; 5]);
        let mut ma = MovingAverage::new(5, 4.0);
        assert_eq!(ma.mean(), 4.0);
        assert_eq!(ma.push(4.0), 4.0);
    }

    #[test]
    fn one_new_sample_moves_mean_by_one_slot() {
        let n = 4.0;
        let (v, x) = (2.0, 10.0);
        let mut w = [0.0; 4];
        seed(&mut w, v);
        let got = moving_average(x, &mut w);
        assert_eq!(got, ((n - 1.0) * v + x) / n);
        assert_eq!(w, [10.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn oldest_sample_falls_off() {
        let mut ma = MovingAverage::new(3, 0.0);
        ma.push(3.0);
        ma.push(6.0);
        ma.push(9.0);
        assert_eq!(ma.mean(), 6.0);
        assert_eq!(ma.push(0.0), 5.0);
    }

    #[test]
    fn zero_size_window_is_one_slot() {
        let mut ma = MovingAverage::new(0, 1.0);
        assert_eq!(ma.len(), 1);
        assert!(!ma.is_empty());
        assert_eq!(ma.push(8.0), 8.0);
        assert_eq!(moving_average(8.0, &mut []), 8.0);
    }

    #[test]
    fn reset_reseeds() {
        let mut ma = MovingAverage::new(4, 0.0);
        ma.push(100.0);
        ma.reset(1.5);
        assert_eq!(ma.mean(), 1.5);
    }

    proptest! {
        #[test]
        fn low_pass_converges_monotonically(
            x in -1.0e6f64..1.0e6,
            start in -1.0e6f64..1.0e6,
            dt in 0.001f64..2.0,
            t in 2.0f64..10.0,
        ) {
            let mut y = start;
            let mut dist = (x - y).abs();
            for _ in 0..200 {
                y = low_pass(x, y, dt, t);
                let d = (x - y).abs();
                prop_assert!(d <= dist + 1e-9 * dist.max(1.0));
                dist = d;
            }
        }
    }
}
