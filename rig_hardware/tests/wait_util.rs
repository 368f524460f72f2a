use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use rig_hardware::error::HwError;
use rig_hardware::util::{
    ReadyPolicy, wait_until_low, wait_until_low_on, wait_until_low_with_timeout,
};
use rig_traits::Clock;
use rig_traits::clock::test_clock::ManualClock;

#[test]
fn wait_until_low_success_path() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    // Flip low after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_low_with_timeout(
        || Ok(high.load(Ordering::Relaxed)),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_low_timeout_path() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_until_low_with_timeout(
        || Ok(high.load(Ordering::Relaxed)),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn blocking_policy_spins_until_low() {
    let mut polls = 0u32;
    wait_until_low(
        || {
            polls += 1;
            Ok(polls < 100)
        },
        ReadyPolicy::Blocking,
    )
    .expect("line eventually low");
    assert_eq!(polls, 100);
}

#[test]
fn line_errors_propagate() {
    let err = wait_until_low(
        || Err(HwError::Gpio("line gone".into())),
        ReadyPolicy::Blocking,
    )
    .expect_err("gpio error");
    assert!(err.to_string().contains("line gone"));
}

#[test]
fn zero_budget_keeps_blocking_contract() {
    assert_eq!(ReadyPolicy::from_timeout_ms(0), ReadyPolicy::Blocking);
    assert!(matches!(
        ReadyPolicy::from_timeout_ms(20),
        ReadyPolicy::Timeout { timeout, .. } if timeout == Duration::from_millis(20)
    ));
}

#[test]
fn timeout_follows_the_injected_clock() {
    let clock = ManualClock::new();
    let epoch = clock.now();
    let mut polls = 0u32;

    let err = wait_until_low_on(
        &clock,
        || {
            polls += 1;
            Ok(true)
        },
        Duration::from_millis(50),
        Duration::from_millis(10),
    )
    .expect_err("line never drops");

    assert!(matches!(err, HwError::DataReadyTimeout));
    // Polled at 0, 10, .., 50 ms of simulated time; no real sleeping.
    assert_eq!(polls, 6);
    assert_eq!(clock.ms_since(epoch), 50);
}

#[test]
fn injected_clock_success_path_does_not_advance() {
    let clock = ManualClock::new();
    let epoch = clock.now();
    wait_until_low_on(&clock, || Ok(false), Duration::from_millis(5), Duration::from_millis(1))
        .expect("already low");
    assert_eq!(clock.ms_since(epoch), 0);
}
