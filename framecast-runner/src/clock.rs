//! Time source for the runner
//!
//! Every wait and every elapsed-time measurement goes through a [`Clock`], so
//! polling and backoff can be driven by simulated time in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time, wall-clock time and sleeping
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic instant used for elapsed-time budgets
    fn now(&self) -> Instant;

    /// Wall-clock timestamp recorded on jobs and events
    fn wall(&self) -> DateTime<Utc>;

    /// Suspends the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real time backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated clock whose `sleep` returns at once and advances time
///
/// Used by tests and dry runs where a twenty-minute timeout must elapse
/// instantly and deterministically.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Moves simulated time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += duration;
    }

    /// Simulated time passed since the clock was created
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn wall(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.wall_origin + offset
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_sleep_advances_time() {
        let clock = ManualClock::new();
        let start = clock.now();
        let wall_start = clock.wall();

        clock.sleep(Duration::from_secs(10)).await;
        clock.sleep(Duration::from_secs(5)).await;

        assert_eq!(clock.now() - start, Duration::from_secs(15));
        assert_eq!((clock.wall() - wall_start).num_seconds(), 15);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(5)]
        );
    }

    #[test]
    fn test_advance_is_not_a_sleep() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
        assert!(clock.sleeps().is_empty());
    }
}
