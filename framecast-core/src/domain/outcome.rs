//! Job outcome types
//!
//! The runner hands one [`JobOutcome`] back to its caller per request instead
//! of propagating errors, so every exit path carries the same timing data.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::job::{FailureKind, JobError};

/// Timing and effort figures collected while driving a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// Round trip of the submit call, including retries
    pub submission_latency: Option<Duration>,
    /// Time from submission until a terminal status was observed
    pub generation_duration: Option<Duration>,
    /// Time spent resolving and downloading the artifact
    pub download_duration: Option<Duration>,
    /// Wall-clock time of the whole run
    pub total_elapsed: Duration,
    /// Number of poll ticks that issued a status query
    pub poll_attempts: u32,
    /// Number of status requests sent, retried requests included
    pub status_queries: u32,
}

impl JobStats {
    /// Mean time between poll attempts during generation
    pub fn average_poll_interval(&self) -> Option<Duration> {
        match (self.generation_duration, self.poll_attempts) {
            (Some(duration), attempts) if attempts > 0 => Some(duration / attempts),
            _ => None,
        }
    }
}

/// Final result of one job run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Success {
        job_id: String,
        path: PathBuf,
        bytes: u64,
        stats: JobStats,
    },
    Failure {
        /// Absent when submission itself failed
        job_id: Option<String>,
        kind: FailureKind,
        detail: JobError,
        stats: JobStats,
    },
}

impl JobOutcome {
    pub fn failure(job_id: Option<String>, detail: JobError, stats: JobStats) -> Self {
        JobOutcome::Failure {
            job_id,
            kind: detail.kind,
            detail,
            stats,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    /// Failure category, `None` on success
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobOutcome::Success { job_id, .. } => Some(job_id),
            JobOutcome::Failure { job_id, .. } => job_id.as_deref(),
        }
    }

    pub fn stats(&self) -> &JobStats {
        match self {
            JobOutcome::Success { stats, .. } | JobOutcome::Failure { stats, .. } => stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_poll_interval() {
        let stats = JobStats {
            generation_duration: Some(Duration::from_secs(30)),
            poll_attempts: 3,
            ..Default::default()
        };
        assert_eq!(stats.average_poll_interval(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_average_poll_interval_without_polls() {
        let stats = JobStats {
            generation_duration: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        assert_eq!(stats.average_poll_interval(), None);
    }

    #[test]
    fn test_failure_kind_follows_detail() {
        let outcome = JobOutcome::failure(
            None,
            JobError::new(FailureKind::AuthenticationError, "invalid api key"),
            JobStats::default(),
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.kind(), Some(FailureKind::AuthenticationError));
        assert_eq!(outcome.job_id(), None);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = JobOutcome::Success {
            job_id: "abc123".to_string(),
            path: PathBuf::from("out.mp4"),
            bytes: 42,
            stats: JobStats::default(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["bytes"], 42);
    }
}
