//! Runner configuration
//!
//! Polling cadence, the overall wait budget, retry behaviour for transient
//! provider failures, and how unrecognized statuses are treated.

use std::time::Duration;
use thiserror::Error;

/// Retry behaviour for a single remote call site
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single backoff delay
    pub max_delay: Duration,

    /// Factor applied to the delay after each retry
    pub backoff_multiplier: f64,

    /// Randomly stretch each delay by up to 100%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// No retries at all; the first transient failure is final
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }
}

/// What to do when a provider reports a status outside its vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatusPolicy {
    /// Log a warning and keep polling until a known terminal status or the timeout
    #[default]
    KeepPolling,

    /// Fail the job after this many consecutive unrecognized statuses
    FailAfter(u32),
}

/// Configuration for driving one job to completion
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Time between status queries
    pub poll_interval: Duration,

    /// Maximum time to wait for a terminal status after submission
    pub max_wait: Duration,

    /// Retry behaviour for submit, status and download calls
    pub retry: RetryConfig,

    pub unknown_status: UnknownStatusPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(20 * 60),
            retry: RetryConfig::default(),
            unknown_status: UnknownStatusPolicy::default(),
        }
    }
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("maximum wait ({max_wait:?}) is shorter than the poll interval ({poll_interval:?})")]
    WaitShorterThanInterval {
        max_wait: Duration,
        poll_interval: Duration,
    },

    #[error("unknown-status threshold must be at least 1")]
    ZeroUnknownThreshold,

    #[error("backoff multiplier must be at least 1.0, got {0}")]
    InvalidBackoffMultiplier(f64),
}

impl PollerConfig {
    /// Creates a configuration with the given cadence and default retry policy
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Checks that the values describe a loop that can terminate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }

        if self.max_wait < self.poll_interval {
            return Err(ConfigError::WaitShorterThanInterval {
                max_wait: self.max_wait,
                poll_interval: self.poll_interval,
            });
        }

        if self.unknown_status == UnknownStatusPolicy::FailAfter(0) {
            return Err(ConfigError::ZeroUnknownThreshold);
        }

        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(multiplier));
        }

        Ok(())
    }

    /// Upper bound on poll ticks that issue a status query
    pub fn max_poll_ticks(&self) -> u32 {
        let ticks = self.max_wait.as_secs_f64() / self.poll_interval.as_secs_f64();
        ticks.ceil() as u32
    }
}
