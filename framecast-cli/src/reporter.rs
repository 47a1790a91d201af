//! Console rendering of job progress
//!
//! Turns runner events into colored progress lines on stdout and prints the
//! final summary.

use colored::*;
use framecast_core::FailureKind;
use framecast_core::domain::event::JobEvent;
use framecast_core::domain::outcome::{JobOutcome, JobStats};
use framecast_runner::EventSink;
use std::time::Duration;

/// Formats a duration for humans
///
/// Under a minute: seconds. Under an hour: minutes with seconds in
/// parentheses. Otherwise hours with minutes in parentheses.
pub fn format_elapsed(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{:.2} seconds", seconds)
    } else if seconds < 3600.0 {
        format!("{:.2} minutes ({:.2} seconds)", seconds / 60.0, seconds)
    } else {
        format!(
            "{:.2} hours ({:.2} minutes)",
            seconds / 3600.0,
            (seconds % 3600.0) / 60.0
        )
    }
}

/// Event sink printing progress for an interactive user
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a line, or nothing for events not worth showing
    pub fn render(event: &JobEvent) -> Option<String> {
        let line = match event {
            JobEvent::Submitted {
                provider,
                job_id,
                latency,
                ..
            } => format!(
                "{} {} job {} (submitted in {})",
                "✓".green(),
                provider.display_name(),
                job_id.cyan(),
                format_elapsed(*latency)
            ),
            JobEvent::PollAttempt {
                raw_status,
                progress,
                elapsed,
                ..
            } => match progress {
                Some(progress) => format!(
                    "  Status: {} {} - Time elapsed: {}",
                    raw_status.yellow(),
                    progress.dimmed(),
                    format_elapsed(*elapsed)
                ),
                None => format!(
                    "  Status: {} - Time elapsed: {}",
                    raw_status.yellow(),
                    format_elapsed(*elapsed)
                ),
            },
            JobEvent::UnrecognizedStatus {
                raw_status,
                consecutive,
                ..
            } => format!(
                "  {} unrecognized status '{}' ({} in a row)",
                "!".yellow(),
                raw_status,
                consecutive
            ),
            JobEvent::RetryScheduled {
                operation,
                attempt,
                max_attempts,
                delay,
                error,
            } => format!(
                "  {} {} failed ({}), retry {}/{} in {}",
                "!".yellow(),
                operation,
                error.dimmed(),
                attempt,
                max_attempts,
                format_elapsed(*delay)
            ),
            JobEvent::GenerationFinished {
                state, duration, ..
            } => format!(
                "Generation {} after {}",
                state.as_str().bold(),
                format_elapsed(*duration)
            ),
            JobEvent::DownloadStarted { .. } => "Downloading video...".to_string(),
            JobEvent::DownloadFinished {
                bytes, duration, ..
            } => format!(
                "{} Downloaded {} bytes in {}",
                "✓".green(),
                bytes,
                format_elapsed(*duration)
            ),
            JobEvent::Finished { .. } => return None,
        };
        Some(line)
    }

    /// Prints the final outcome with its timing breakdown
    pub fn print_outcome(outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Success { path, stats, .. } => {
                println!();
                println!("{}", "Video saved".green().bold());
                println!("  {} {}", "Path:".bold(), path.display());
                print_stats(stats);
            }
            JobOutcome::Failure {
                job_id,
                kind,
                detail,
                stats,
            } => {
                println!();
                println!("{}", failure_headline(*kind).red().bold());
                if let Some(job_id) = job_id {
                    println!("  {} {}", "Job:".bold(), job_id);
                }
                println!("  {} {}", "Reason:".bold(), detail.message);
                if let Some(code) = &detail.provider_code {
                    println!("  {} {}", "Code:".bold(), code);
                }
                if let Some(raw) = &detail.raw {
                    println!("  {} {}", "Response:".bold(), raw.to_string().dimmed());
                }
                print_stats(stats);
            }
        }
    }
}

impl EventSink for ConsoleReporter {
    fn emit(&self, event: &JobEvent) {
        if let Some(line) = Self::render(event) {
            println!("{}", line);
        }
    }
}

fn failure_headline(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::AuthenticationError => "Authentication failed",
        FailureKind::InvalidRequestError => "Request rejected",
        FailureKind::TransientNetworkError => "Network error",
        FailureKind::ProviderReportedFailure => "Generation failed",
        FailureKind::Timeout => "Timed out waiting for the video",
        FailureKind::ResultUnavailable => "Video generated but could not be downloaded",
        FailureKind::Cancelled => "Cancelled",
        FailureKind::UnrecognizedStatus => "Unrecognized job status",
        FailureKind::UnexpectedResponse => "Unexpected provider response",
    }
}

fn print_stats(stats: &JobStats) {
    if let Some(latency) = stats.submission_latency {
        println!("  {} {}", "Submission:".bold(), format_elapsed(latency));
    }
    if let Some(generation) = stats.generation_duration {
        println!(
            "  {} {} ({} status checks)",
            "Generation:".bold(),
            format_elapsed(generation),
            stats.poll_attempts
        );
    }
    if let Some(download) = stats.download_duration {
        println!("  {} {}", "Download:".bold(), format_elapsed(download));
    }
    println!("  {} {}", "Total:".bold(), format_elapsed(stats.total_elapsed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::{CanonicalState, ProviderKind};

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(12_500)), "12.50 seconds");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(
            format_elapsed(Duration::from_secs(90)),
            "1.50 minutes (90.00 seconds)"
        );
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(
            format_elapsed(Duration::from_secs(5400)),
            "1.50 hours (30.00 minutes)"
        );
    }

    #[test]
    fn test_poll_line_includes_status_and_progress() {
        colored::control::set_override(false);
        let line = ConsoleReporter::render(&JobEvent::PollAttempt {
            job_id: "abc123".to_string(),
            attempt: 2,
            raw_status: "processing".to_string(),
            state: CanonicalState::Processing,
            progress: Some("40%".to_string()),
            elapsed: Duration::from_secs(20),
        })
        .unwrap();

        assert_eq!(line, "  Status: processing 40% - Time elapsed: 20.00 seconds");
    }

    #[test]
    fn test_submitted_line_names_provider() {
        colored::control::set_override(false);
        let line = ConsoleReporter::render(&JobEvent::Submitted {
            provider: ProviderKind::Runway,
            job_id: "task-1".to_string(),
            at: chrono::Utc::now(),
            latency: Duration::from_secs(1),
        })
        .unwrap();

        assert!(line.contains("task-1"));
        assert!(line.contains(ProviderKind::Runway.display_name()));
    }

    #[test]
    fn test_finished_is_not_rendered() {
        let event = JobEvent::Finished {
            job_id: None,
            failure: Some(FailureKind::Timeout),
            stats: JobStats::default(),
        };
        assert!(ConsoleReporter::render(&event).is_none());
    }
}
