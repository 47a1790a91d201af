//! Event sinks
//!
//! The runner reports progress as [`JobEvent`] values. A sink decides what to
//! do with them: log them, collect them, or render them for a user.

use framecast_core::domain::event::JobEvent;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Receiver of job lifecycle events
///
/// Implementations must not block; they are called inline from the job flow.
pub trait EventSink: Send + Sync {
    /// Handles one event
    ///
    /// # Arguments
    /// * `event` - The event to handle
    fn emit(&self, event: &JobEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &JobEvent) {
        (**self).emit(event)
    }
}

/// Sink that writes every event as a structured tracing record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &JobEvent) {
        match event {
            JobEvent::Submitted {
                provider,
                job_id,
                latency,
                ..
            } => info!(
                provider = %provider,
                job_id = %job_id,
                latency_ms = latency.as_millis() as u64,
                "Job submitted"
            ),
            JobEvent::PollAttempt {
                job_id,
                attempt,
                raw_status,
                state,
                progress,
                elapsed,
            } => debug!(
                job_id = %job_id,
                attempt = attempt,
                raw_status = %raw_status,
                state = %state,
                progress = progress.as_deref().unwrap_or("-"),
                elapsed_s = elapsed.as_secs(),
                "Polled job status"
            ),
            JobEvent::UnrecognizedStatus {
                job_id,
                raw_status,
                consecutive,
            } => warn!(
                job_id = %job_id,
                raw_status = %raw_status,
                consecutive = consecutive,
                "Unrecognized job status"
            ),
            JobEvent::RetryScheduled {
                operation,
                attempt,
                max_attempts,
                delay,
                error,
            } => warn!(
                operation = %operation,
                attempt = attempt,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient failure"
            ),
            JobEvent::GenerationFinished {
                job_id,
                state,
                duration,
            } => info!(
                job_id = %job_id,
                state = %state.as_str(),
                duration_s = duration.as_secs(),
                "Generation finished"
            ),
            JobEvent::DownloadStarted { job_id } => {
                debug!(job_id = %job_id, "Downloading result")
            }
            JobEvent::DownloadFinished {
                job_id,
                path,
                bytes,
                duration,
            } => info!(
                job_id = %job_id,
                path = %path.display(),
                bytes = bytes,
                duration_ms = duration.as_millis() as u64,
                "Result saved"
            ),
            JobEvent::Finished {
                job_id,
                failure,
                stats,
            } => info!(
                job_id = job_id.as_deref().unwrap_or("-"),
                failure = failure.map(|k| k.as_str()).unwrap_or("none"),
                total_s = stats.total_elapsed.as_secs(),
                poll_attempts = stats.poll_attempts,
                "Job finished"
            ),
        }
    }
}

/// Sink that keeps every event in memory
///
/// Clones share the same buffer, so one handle can be given to the runner
/// while another is used to inspect what was emitted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: &JobEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_sink_shares_buffer_between_clones() {
        let sink = InMemoryEventSink::new();
        let handle = sink.clone();

        sink.emit(&JobEvent::DownloadStarted {
            job_id: "abc123".to_string(),
        });

        assert_eq!(
            handle.events(),
            vec![JobEvent::DownloadStarted {
                job_id: "abc123".to_string()
            }]
        );
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(InMemoryEventSink::new());
        let shared: Arc<dyn EventSink> = sink.clone();

        shared.emit(&JobEvent::DownloadStarted {
            job_id: "abc123".to_string(),
        });

        assert_eq!(sink.events().len(), 1);
    }
}
