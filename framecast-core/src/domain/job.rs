//! Job domain types
//!
//! A [`Job`] tracks one remote generation request from submission to a
//! terminal outcome. Its fields are private: state only moves forward through
//! the transition methods, which keep these invariants:
//!
//! - states are visited along `Submitted -> Polling -> terminal`, never backwards
//! - a result locator is present if and only if the job succeeded
//! - an error is present if and only if the job failed, timed out or was cancelled

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::provider::ProviderKind;
use crate::status::CanonicalState;

/// Lifecycle state of a job as seen by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut | JobState::Cancelled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Submitted => 0,
            JobState::Polling => 1,
            _ => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed_out",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a job failure
///
/// `ResultUnavailable` is a delivery failure: generation succeeded but the
/// artifact could not be retrieved. It is kept apart from generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials were rejected; never retried
    AuthenticationError,
    /// The request was malformed or refused; never retried
    InvalidRequestError,
    /// Network or 5xx failures persisted beyond the retry budget
    TransientNetworkError,
    /// The provider reported the job as failed
    ProviderReportedFailure,
    /// The wait budget elapsed before a terminal status; the remote outcome is unknown
    Timeout,
    /// Generation succeeded but the artifact could not be delivered
    ResultUnavailable,
    /// The caller cancelled the job
    Cancelled,
    /// Too many consecutive unrecognized statuses under a fail-after policy
    UnrecognizedStatus,
    /// The provider answered with a payload that could not be interpreted
    UnexpectedResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AuthenticationError => "authentication_error",
            FailureKind::InvalidRequestError => "invalid_request_error",
            FailureKind::TransientNetworkError => "transient_network_error",
            FailureKind::ProviderReportedFailure => "provider_reported_failure",
            FailureKind::Timeout => "timeout",
            FailureKind::ResultUnavailable => "result_unavailable",
            FailureKind::Cancelled => "cancelled",
            FailureKind::UnrecognizedStatus => "unrecognized_status",
            FailureKind::UnexpectedResponse => "unexpected_response",
        }
    }

    /// Whether the failure happened after the provider finished generating
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, FailureKind::ResultUnavailable)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured failure detail
///
/// `raw` preserves the provider payload verbatim when one was available, so a
/// caller can render diagnostics without the runner formatting anything.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: FailureKind,
    pub message: String,
    pub provider_code: Option<String>,
    pub raw: Option<serde_json::Value>,
}

impl JobError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_code: None,
            raw: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn with_raw(mut self, raw: Option<serde_json::Value>) -> Self {
        self.raw = raw;
        self
    }
}

/// Opaque, non-empty reference to a finished artifact (URL or file handle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLocator(String);

impl ResultLocator {
    /// Returns `None` for empty or blank values
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when code tries to move a job against its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobTransitionError {
    #[error("job {job_id}: cannot move from {from} to {to}")]
    IllegalTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    #[error("job {job_id}: {operation} requires state {expected}, found {found}")]
    WrongState {
        job_id: String,
        operation: &'static str,
        expected: JobState,
        found: JobState,
    },
}

/// One remote generation request
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    id: String,
    provider: ProviderKind,
    state: JobState,
    last_canonical: Option<CanonicalState>,
    raw_status: Option<String>,
    result_locator: Option<ResultLocator>,
    error: Option<JobError>,
    delivery_error: Option<JobError>,
    submitted_at: DateTime<Utc>,
    last_polled_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a job for an identifier the provider just assigned
    pub fn new(id: impl Into<String>, provider: ProviderKind, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            provider,
            state: JobState::Submitted,
            last_canonical: None,
            raw_status: None,
            result_locator: None,
            error: None,
            delivery_error: None,
            submitted_at,
            last_polled_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Canonical state from the most recent status query
    pub fn last_canonical(&self) -> Option<CanonicalState> {
        self.last_canonical
    }

    /// Raw provider status from the most recent status query
    pub fn raw_status(&self) -> Option<&str> {
        self.raw_status.as_deref()
    }

    pub fn result_locator(&self) -> Option<&ResultLocator> {
        self.result_locator.as_ref()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Artifact retrieval failure recorded after a successful generation
    pub fn delivery_error(&self) -> Option<&JobError> {
        self.delivery_error.as_ref()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn last_polled_at(&self) -> Option<DateTime<Utc>> {
        self.last_polled_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Moves a freshly submitted job into the polling phase
    pub fn begin_polling(&mut self) -> Result<(), JobTransitionError> {
        self.advance(JobState::Polling)
    }

    /// Records the answer to one status query
    pub fn record_poll(
        &mut self,
        raw_status: impl Into<String>,
        canonical: CanonicalState,
        at: DateTime<Utc>,
    ) -> Result<(), JobTransitionError> {
        self.require(JobState::Polling, "record_poll")?;
        self.raw_status = Some(raw_status.into());
        self.last_canonical = Some(canonical);
        self.last_polled_at = Some(at);
        Ok(())
    }

    /// Marks generation as successful with the artifact locator
    pub fn succeed(&mut self, locator: ResultLocator) -> Result<(), JobTransitionError> {
        self.advance(JobState::Succeeded)?;
        self.result_locator = Some(locator);
        Ok(())
    }

    /// Marks the job failed
    pub fn fail(&mut self, error: JobError) -> Result<(), JobTransitionError> {
        self.advance(JobState::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Marks the job timed out; its remote outcome is unknown
    pub fn time_out(&mut self, error: JobError) -> Result<(), JobTransitionError> {
        self.advance(JobState::TimedOut)?;
        self.error = Some(error);
        Ok(())
    }

    /// Marks the job cancelled by the caller
    pub fn cancel(&mut self, error: JobError) -> Result<(), JobTransitionError> {
        self.advance(JobState::Cancelled)?;
        self.error = Some(error);
        Ok(())
    }

    /// Records that the artifact of a succeeded job could not be delivered
    ///
    /// The job stays `Succeeded`: the provider did generate the result.
    pub fn record_delivery_failure(&mut self, error: JobError) -> Result<(), JobTransitionError> {
        self.require(JobState::Succeeded, "record_delivery_failure")?;
        self.delivery_error = Some(error);
        Ok(())
    }

    fn require(
        &self,
        expected: JobState,
        operation: &'static str,
    ) -> Result<(), JobTransitionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(JobTransitionError::WrongState {
                job_id: self.id.clone(),
                operation,
                expected,
                found: self.state,
            })
        }
    }

    fn advance(&mut self, to: JobState) -> Result<(), JobTransitionError> {
        if self.state.is_terminal() || to.rank() <= self.state.rank() {
            return Err(JobTransitionError::IllegalTransition {
                job_id: self.id.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
