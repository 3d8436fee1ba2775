#![allow(dead_code)]

use std::time::Duration;

pub use watchrun_test_utils::{
    init_tracing, with_timeout, FakeGroup, FakeLauncher, FakeRegistry, WatchConfigBuilder,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Poll `cond` every 5ms (of Tokio time) until it holds.
///
/// Panics with `what` if it does not hold within 5 seconds.
pub async fn eventually<F>(what: &str, cond: F)
where
    F: Fn() -> bool,
{
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true: {what}");
}
