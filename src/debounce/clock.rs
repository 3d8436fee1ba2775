// src/debounce/clock.rs

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use tokio::time::Instant;

/// Future returned by [`Clock::sleep_until`].
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Time source of the debounce loop.
///
/// The loop both reads "now" and waits for deadlines through this trait,
/// so an implementation controls both sides and they cannot drift apart.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;

    /// Resolve once [`Clock::now`] has reached `deadline`.
    fn sleep_until(&self, deadline: Instant) -> Sleep;
}

/// Tokio's clock. Honours `tokio::time::pause`, which is what makes the
/// debounce loop deterministic under `#[tokio::test(start_paused = true)]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> Sleep {
        Box::pin(tokio::time::sleep_until(deadline))
    }
}
