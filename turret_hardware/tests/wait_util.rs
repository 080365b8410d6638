use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use turret_hardware::error::HwError;
use turret_hardware::util::wait_until_ready_with_timeout;

#[test]
fn wait_until_ready_success_path() {
    let busy = Arc::new(AtomicBool::new(true));
    let busy_bg = busy.clone();
    // Clear busy after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        busy_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_ready_with_timeout(
        || Ok(busy.load(Ordering::Relaxed)),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_ready_timeout_path() {
    let err = wait_until_ready_with_timeout(
        || Ok(true),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::Timeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn probe_error_is_returned_without_retry() {
    let calls = AtomicUsize::new(0);
    let err = wait_until_ready_with_timeout(
        || {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(HwError::I2c("nack".into()))
        },
        Duration::from_millis(50),
        Duration::from_micros(200),
    )
    .expect_err("expected probe error");

    assert!(matches!(err, HwError::I2c(_)));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}
