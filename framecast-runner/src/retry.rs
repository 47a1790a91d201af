//! Retry logic with exponential backoff
//!
//! Transient provider failures are retried a bounded number of times per call
//! site. Waits go through the injected [`Clock`], and each scheduled retry is
//! reported as a [`JobEvent::RetryScheduled`].
//!
//! A caller can additionally share one retry budget across many calls and
//! set a deadline that no backoff sleep may cross.

use framecast_client::AdapterError;
use framecast_core::domain::event::{JobEvent, RemoteOperation};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::RetryConfig;
use crate::service::EventSink;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for AdapterError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Where a retried call runs and who hears about it
pub struct RetryContext<'a> {
    pub config: &'a RetryConfig,
    pub clock: &'a dyn Clock,
    pub events: &'a dyn EventSink,
    pub operation: RemoteOperation,
    /// Retries left across every call drawing from the same budget
    pub budget: Option<&'a mut u32>,
    /// Backoff is cut short at this instant and no retry starts after it
    pub deadline: Option<Instant>,
}

impl<'a> RetryContext<'a> {
    /// Context with only the per-call limit
    pub fn new(
        config: &'a RetryConfig,
        clock: &'a dyn Clock,
        events: &'a dyn EventSink,
        operation: RemoteOperation,
    ) -> Self {
        Self {
            config,
            clock,
            events,
            operation,
            budget: None,
            deadline: None,
        }
    }

    fn may_retry(&self, attempt: u32) -> bool {
        let budget_left = self.budget.as_deref().is_none_or(|left| *left > 0);
        let time_left = self.remaining().is_none_or(|r| !r.is_zero());
        attempt < self.config.max_attempts && budget_left && time_left
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }
}

/// Runs `operation`, retrying retryable errors with exponential backoff
///
/// Returns the first success, the first non-retryable error, or the last
/// error once `max_attempts` retries, the shared budget or the time up to
/// the deadline are used up.
pub async fn with_retry<F, Fut, T, E>(mut ctx: RetryContext<'_>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + Display,
{
    let config = ctx.config;
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        operation = %ctx.operation,
                        attempts = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && ctx.may_retry(attempt) => {
                attempt += 1;
                if let Some(left) = ctx.budget.as_deref_mut() {
                    *left -= 1;
                }

                let mut wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                if let Some(remaining) = ctx.remaining() {
                    wait = wait.min(remaining);
                }

                ctx.events.emit(&JobEvent::RetryScheduled {
                    operation: ctx.operation,
                    attempt,
                    max_attempts: config.max_attempts,
                    delay: wait,
                    error: e.to_string(),
                });

                ctx.clock.sleep(wait).await;

                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        operation = %ctx.operation,
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after retries were exhausted"
                    );
                } else {
                    tracing::debug!(
                        operation = %ctx.operation,
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    let next = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
    next.min(config.max_delay)
}

/// Stretches a delay by a random factor between 0% and 100%
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
