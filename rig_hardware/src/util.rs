use std::time::Duration;

use rig_traits::{Clock, MonotonicClock};

use crate::error::{HwError, Result};

/// How long a conversion may take before `read()` gives up on the device.
///
/// `Blocking` is the device contract: the HX711 is polled until DOUT goes low,
/// however long that takes, and recovery is left to a watchdog outside the
/// driver. `Timeout` bounds the wait so a missing or dead sensor surfaces as
/// `HwError::DataReadyTimeout` instead of a hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyPolicy {
    #[default]
    Blocking,
    Timeout {
        timeout: Duration,
        poll_interval: Duration,
    },
}

impl ReadyPolicy {
    /// Bounded wait from a millisecond budget; 0 keeps the blocking contract.
    pub fn from_timeout_ms(ms: u64) -> Self {
        if ms == 0 {
            Self::Blocking
        } else {
            Self::Timeout {
                timeout: Duration::from_millis(ms),
                poll_interval: Duration::from_micros(200),
            }
        }
    }
}

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// or a timeout expires. Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_low_with_timeout(
    is_high: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    wait_until_low_on(&MonotonicClock, is_high, timeout, poll_interval)
}

/// `wait_until_low_with_timeout` measured and paced by `clock`.
pub fn wait_until_low_on<C: Clock + ?Sized>(
    clock: &C,
    mut is_high: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = clock.now() + timeout;
    while is_high()? {
        if clock.now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        clock.sleep(poll_interval);
    }
    Ok(())
}

/// Wait for the line to go low under the given policy.
pub fn wait_until_low(is_high: impl FnMut() -> Result<bool>, policy: ReadyPolicy) -> Result<()> {
    match policy {
        ReadyPolicy::Blocking => spin_until_low(is_high),
        ReadyPolicy::Timeout {
            timeout,
            poll_interval,
        } => wait_until_low_with_timeout(is_high, timeout, poll_interval),
    }
}

fn spin_until_low(mut is_high: impl FnMut() -> Result<bool>) -> Result<()> {
    while is_high()? {
        std::hint::spin_loop();
    }
    Ok(())
}
