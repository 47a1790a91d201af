//! Error types for the provider adapters

use framecast_core::{FailureKind, JobError};
use serde_json::Value;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors that can occur when talking to a provider
///
/// Adapters never retry on their own; callers use [`AdapterError::is_transient`]
/// to decide whether a call is worth repeating.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP transport failed (connect, timeout, broken body)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Credentials were rejected
    #[error("Authentication rejected{}: {message}", fmt_status(*.status))]
    Authentication {
        status: Option<u16>,
        message: String,
        raw: Option<Value>,
    },

    /// The provider refused the request as malformed or not allowed
    #[error("Invalid request{}: {message}", fmt_status(*.status))]
    InvalidRequest {
        status: Option<u16>,
        message: String,
        raw: Option<Value>,
    },

    /// Temporary provider-side failure (5xx, throttling)
    #[error("Transient provider error{}: {message}", fmt_status(*.status))]
    Transient {
        status: Option<u16>,
        message: String,
        raw: Option<Value>,
    },

    /// The finished artifact cannot be retrieved
    #[error("Result unavailable: {message}")]
    ResultUnavailable { message: String, raw: Option<Value> },

    /// The provider answered with something we could not interpret
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String, raw: Option<Value> },
}

fn fmt_status(status: Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

impl AdapterError {
    /// Classifies a non-success HTTP status and its response body
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let raw = serde_json::from_str::<Value>(&body).ok();
        let message = raw
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.clone()
                }
            });
        Self::classify(status, message, raw)
    }

    /// Builds the error variant matching an HTTP-style status code
    pub fn classify(status: u16, message: impl Into<String>, raw: Option<Value>) -> Self {
        let message = message.into();

        match status {
            401 | 403 => Self::Authentication {
                status: Some(status),
                message,
                raw,
            },
            408 | 429 | 500..=599 => Self::Transient {
                status: Some(status),
                message,
                raw,
            },
            _ => Self::InvalidRequest {
                status: Some(status),
                message,
                raw,
            },
        }
    }

    pub fn unexpected(message: impl Into<String>, raw: Option<Value>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
            raw,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            status: None,
            message: message.into(),
            raw: None,
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            Self::Transient { .. } => true,
            _ => false,
        }
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            Self::Authentication { status, .. }
            | Self::InvalidRequest { status, .. }
            | Self::Transient { status, .. } => *status,
            Self::ResultUnavailable { .. } | Self::UnexpectedResponse { .. } => None,
        }
    }

    /// Provider payload attached to the error, if any
    pub fn raw(&self) -> Option<&Value> {
        match self {
            Self::RequestFailed(_) => None,
            Self::Authentication { raw, .. }
            | Self::InvalidRequest { raw, .. }
            | Self::Transient { raw, .. }
            | Self::ResultUnavailable { raw, .. }
            | Self::UnexpectedResponse { raw, .. } => raw.as_ref(),
        }
    }

    /// Failure category for a job that ends with this error
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RequestFailed(_) | Self::Transient { .. } => FailureKind::TransientNetworkError,
            Self::Authentication { .. } => FailureKind::AuthenticationError,
            Self::InvalidRequest { .. } => FailureKind::InvalidRequestError,
            Self::ResultUnavailable { .. } => FailureKind::ResultUnavailable,
            Self::UnexpectedResponse { .. } => FailureKind::UnexpectedResponse,
        }
    }

    /// Rewrites non-transient errors from artifact retrieval as `ResultUnavailable`
    pub fn into_delivery_error(self) -> Self {
        if self.is_transient() || matches!(self, Self::ResultUnavailable { .. }) {
            return self;
        }
        let raw = self.raw().cloned();
        Self::ResultUnavailable {
            message: self.to_string(),
            raw,
        }
    }

    /// Converts into the job-level failure detail
    pub fn to_job_error(&self) -> JobError {
        let mut error = JobError::new(self.failure_kind(), self.to_string())
            .with_raw(self.raw().cloned());
        if let Some(status) = self.status() {
            error = error.with_provider_code(status.to_string());
        }
        error
    }
}

/// Pulls a human-readable message out of common provider error bodies
fn extract_message(raw: &Value) -> Option<String> {
    let candidates = [
        raw.get("message"),
        raw.get("error").and_then(|e| e.get("message").or(Some(e))),
        raw.get("base_resp").and_then(|b| b.get("status_msg")),
        raw.get("detail"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}
