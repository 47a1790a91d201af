//! Service layer
//!
//! Services used by the orchestrator: artifact delivery and progress event
//! sinks. Sinks are trait-based so hosts can plug in their own rendering.

mod events;
mod fetcher;

// Re-export traits
pub use events::EventSink;

// Re-export implementations
pub use events::{InMemoryEventSink, TracingEventSink};
pub use fetcher::{FetchError, ResultFetcher};
