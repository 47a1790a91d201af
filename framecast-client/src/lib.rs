//! Framecast provider adapters
//!
//! One adapter per image-to-video vendor, all behind the [`ProviderAdapter`]
//! trait. The runner drives any of them without knowing the vendor's payload
//! shapes or status vocabulary.
//!
//! Adapters are stateless between calls and hold no job data, so a single
//! instance can be shared by concurrent job flows.
//!
//! # Example
//!
//! ```no_run
//! use framecast_client::{MiniMaxAdapter, ProviderAdapter};
//! use framecast_core::dto::job::{ImageInput, JobRequest};
//!
//! # async fn example() -> framecast_client::Result<()> {
//! let adapter = MiniMaxAdapter::new("my-api-key");
//! let request = JobRequest::new("a paper boat drifting", "out/boat.mp4")
//!     .with_image(ImageInput::Url("https://example.com/boat.jpg".to_string()));
//!
//! let job_id = adapter.submit(&request).await?;
//! let report = adapter.query_status(&job_id).await?;
//! println!("{} is {}", job_id, report.raw_status);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod http;
pub mod kling;
pub mod minimax;
pub mod runway;
mod stream;

pub use error::{AdapterError, Result};
pub use kling::KlingAdapter;
pub use minimax::MiniMaxAdapter;
pub use runway::RunwayAdapter;
pub use stream::ArtifactStream;

use async_trait::async_trait;
use framecast_core::dto::job::JobRequest;
use framecast_core::{ProviderKind, ResultLocator};
use serde::{Deserialize, Serialize};

/// Failure detail reported by a provider for a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderErrorDetail {
    pub code: Option<String>,
    pub message: String,
}

/// Answer to one status query
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Status exactly as the provider spelled it
    pub raw_status: String,
    /// Artifact reference, present once the provider exposes one
    pub locator: Option<ResultLocator>,
    pub error_detail: Option<ProviderErrorDetail>,
    /// Provider progress indication, when one is reported
    pub progress: Option<String>,
    /// Verbatim response payload, kept for diagnostics
    pub raw: serde_json::Value,
}

/// Contract implemented once per vendor
///
/// Every method performs at most one logical provider exchange and never
/// retries; retry policy belongs to the caller.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter speaks to
    fn provider(&self) -> ProviderKind;

    /// Submits a generation request and returns the provider's job id
    async fn submit(&self, request: &JobRequest) -> Result<String>;

    /// Queries the current status of a job
    async fn query_status(&self, job_id: &str) -> Result<StatusReport>;

    /// Exchanges a locator for a download and starts streaming the artifact
    async fn resolve_and_fetch(&self, locator: &ResultLocator) -> Result<ArtifactStream>;
}
