//! Framecast Runner
//!
//! Lifecycle engine for image-to-video jobs. Given a provider adapter and a
//! [`JobRequest`](framecast_core::dto::job::JobRequest), it submits the job,
//! polls until the provider reports a terminal status, and saves the result.
//!
//! Architecture:
//! - Configuration: poll cadence, wait budget, retry and unknown-status policy
//! - Clock: injectable time source so waits can be simulated
//! - Scheduler: the per-job status poll loop
//! - Services: artifact delivery and progress event sinks
//! - Orchestrator: the end-to-end driver returning a typed outcome
//!
//! ```no_run
//! use std::sync::Arc;
//! use framecast_client::MiniMaxAdapter;
//! use framecast_core::dto::job::{ImageInput, JobRequest};
//! use framecast_runner::{JobOrchestrator, PollerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = Arc::new(MiniMaxAdapter::new("my-api-key"));
//! let orchestrator = JobOrchestrator::new(adapter, PollerConfig::default())?;
//!
//! let request = JobRequest::new("a paper boat drifting", "out/boat.mp4")
//!     .with_image(ImageInput::Url("https://example.com/boat.jpg".to_string()));
//! let outcome = orchestrator.run(request, CancellationToken::new()).await;
//! println!("success: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{ConfigError, PollerConfig, RetryConfig, UnknownStatusPolicy};
pub use orchestrator::JobOrchestrator;
pub use scheduler::{StatusPoller, TickOutcome};
pub use service::{EventSink, InMemoryEventSink, ResultFetcher, TracingEventSink};
