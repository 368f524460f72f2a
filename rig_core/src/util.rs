//! Time and rate helpers shared by the rotation capture.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;
/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: u64 = 60_000;

/// Instantaneous speed in rotations per minute for one pulse per `interval_ms`.
/// - Returns 0.0 for a zero interval instead of dividing by zero.
#[inline]
pub fn rpm_from_interval_ms(interval_ms: u64) -> f64 {
    if interval_ms == 0 {
        return 0.0;
    }
    MILLIS_PER_MIN as f64 / interval_ms as f64
}

/// Pulse interval in milliseconds that produces `rpm`, rounded to nearest.
/// - Clamps to at least 1 ms; non-positive or non-finite speeds yield `None`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn interval_ms_from_rpm(rpm: f64) -> Option<u64> {
    if !rpm.is_finite() || rpm <= 0.0 {
        return None;
    }
    let ms = (MILLIS_PER_MIN as f64 / rpm).round();
    Some((ms as u64).max(1))
}

/// Milliseconds to seconds.
#[inline]
pub fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / MILLIS_PER_SEC as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_of_common_intervals() {
        assert_eq!(rpm_from_interval_ms(1_000), 60.0);
        assert_eq!(rpm_from_interval_ms(100), 600.0);
        assert_eq!(rpm_from_interval_ms(0), 0.0);
    }

    #[test]
    fn interval_for_rpm_clamps_and_rejects() {
        assert_eq!(interval_ms_from_rpm(60.0), Some(1_000));
        assert_eq!(interval_ms_from_rpm(1e9), Some(1));
        assert_eq!(interval_ms_from_rpm(0.0), None);
        assert_eq!(interval_ms_from_rpm(f64::NAN), None);
    }
}
