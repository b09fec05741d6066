//! Injectable waiting.
//!
//! Simulated sub-steps and mock collaborator latency wait through a
//! [`Clock`]. [`TokioClock`] really sleeps; [`InstantClock`] only yields to
//! the scheduler, so progress events can still be observed between steps,
//! and tallies the time it was asked to wait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Source of (possibly simulated) delays.
#[async_trait]
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock delays on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Zero-latency clock for tests and `instant` mode.
#[derive(Debug, Default)]
pub struct InstantClock {
    requested_ms: AtomicU64,
}

impl InstantClock {
    /// A clock with nothing requested yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time callers have asked to sleep.
    pub fn requested(&self) -> Duration {
        Duration::from_millis(self.requested_ms.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.requested_ms.fetch_add(millis, Ordering::Relaxed);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_clock_tallies_without_waiting() {
        let clock = InstantClock::new();
        let started = std::time::Instant::now();
        clock.sleep(Duration::from_secs(30)).await;
        clock.sleep(Duration::from_millis(250)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(clock.requested(), Duration::from_millis(30_250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_advances_virtual_time() {
        let started = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(800)).await;
        assert!(started.elapsed() >= Duration::from_millis(800));
    }
}
