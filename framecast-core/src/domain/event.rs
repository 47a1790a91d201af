//! Progress event types
//!
//! The runner emits these as structured data; rendering them is left to the
//! reporting layer (console output, logs, a UI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::job::{FailureKind, JobState};
use crate::domain::outcome::JobStats;
use crate::domain::provider::ProviderKind;
use crate::status::CanonicalState;

/// Remote call site that a retry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    Submit,
    QueryStatus,
    Download,
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteOperation::Submit => write!(f, "submit"),
            RemoteOperation::QueryStatus => write!(f, "status query"),
            RemoteOperation::Download => write!(f, "download"),
        }
    }
}

/// A lifecycle event for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Submitted {
        provider: ProviderKind,
        job_id: String,
        at: DateTime<Utc>,
        latency: Duration,
    },
    PollAttempt {
        job_id: String,
        attempt: u32,
        raw_status: String,
        state: CanonicalState,
        progress: Option<String>,
        elapsed: Duration,
    },
    UnrecognizedStatus {
        job_id: String,
        raw_status: String,
        consecutive: u32,
    },
    RetryScheduled {
        operation: RemoteOperation,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: String,
    },
    GenerationFinished {
        job_id: String,
        state: JobState,
        duration: Duration,
    },
    DownloadStarted {
        job_id: String,
    },
    DownloadFinished {
        job_id: String,
        path: PathBuf,
        bytes: u64,
        duration: Duration,
    },
    Finished {
        job_id: Option<String>,
        failure: Option<FailureKind>,
        stats: JobStats,
    },
}
