//! Status poller
//!
//! Drives one submitted job to a terminal state. Each [`StatusPoller::tick`]
//! checks cancellation and the wait budget, issues one status query (with
//! bounded retries), normalizes the answer and updates the [`Job`]. The
//! caller decides how to wait between ticks; [`StatusPoller::run`] does it
//! through the injected clock.

use framecast_client::{ProviderAdapter, StatusReport};
use framecast_core::domain::event::{JobEvent, RemoteOperation};
use framecast_core::{CanonicalState, FailureKind, Job, JobError, JobTransitionError, normalize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{PollerConfig, UnknownStatusPolicy};
use crate::retry::{RetryContext, with_retry};
use crate::service::EventSink;

/// What the caller should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The job is still running; wait this long before the next tick
    Wait(Duration),
    /// The job reached a terminal state
    Done,
}

/// Poll loop over a single job
pub struct StatusPoller<'a> {
    adapter: &'a dyn ProviderAdapter,
    config: &'a PollerConfig,
    clock: &'a dyn Clock,
    events: &'a dyn EventSink,
    started: Instant,
    poll_attempts: u32,
    status_queries: u32,
    /// Status-query retries left for the whole job
    query_retries_left: u32,
    consecutive_unknown: u32,
}

impl<'a> StatusPoller<'a> {
    /// Creates a poller whose wait budget starts at `started`
    pub fn new(
        adapter: &'a dyn ProviderAdapter,
        config: &'a PollerConfig,
        clock: &'a dyn Clock,
        events: &'a dyn EventSink,
        started: Instant,
    ) -> Self {
        Self {
            adapter,
            config,
            clock,
            events,
            started,
            poll_attempts: 0,
            status_queries: 0,
            query_retries_left: config.retry.max_attempts,
            consecutive_unknown: 0,
        }
    }

    /// Ticks that issued a status query
    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    /// Status requests sent, retries included
    pub fn status_queries(&self) -> u32 {
        self.status_queries
    }

    fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    /// Polls until the job is terminal, sleeping between ticks
    pub async fn run(
        &mut self,
        job: &mut Job,
        cancel: &CancellationToken,
    ) -> Result<(), JobTransitionError> {
        info!(
            job_id = %job.id(),
            interval_s = self.config.poll_interval.as_secs(),
            max_wait_s = self.config.max_wait.as_secs(),
            "Polling job status"
        );

        loop {
            match self.tick(job, cancel).await? {
                TickOutcome::Done => return Ok(()),
                TickOutcome::Wait(delay) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = self.clock.sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Performs one poll cycle
    ///
    /// The job must be in `Polling`. Returns [`TickOutcome::Done`] once the
    /// job has been moved to a terminal state.
    pub async fn tick(
        &mut self,
        job: &mut Job,
        cancel: &CancellationToken,
    ) -> Result<TickOutcome, JobTransitionError> {
        if cancel.is_cancelled() {
            return self.cancel(job).map(|_| TickOutcome::Done);
        }

        if self.elapsed() >= self.config.max_wait {
            return self.time_out(job).map(|_| TickOutcome::Done);
        }

        self.poll_attempts += 1;
        let job_id = job.id().to_string();
        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.cancel(job).map(|_| TickOutcome::Done),
            result = self.query(&job_id) => result,
        };

        let report = match report {
            Ok(report) => report,
            // retries were cut short by the wait budget
            Err(e) if e.is_transient() && self.elapsed() >= self.config.max_wait => {
                warn!(job_id = %job.id(), error = %e, "Status query still failing at the deadline");
                return self.time_out(job).map(|_| TickOutcome::Done);
            }
            Err(e) => {
                error!(job_id = %job.id(), error = %e, "Status query failed");
                job.fail(e.to_job_error())?;
                return Ok(TickOutcome::Done);
            }
        };

        let canonical = normalize(job.provider(), &report.raw_status);
        job.record_poll(&report.raw_status, canonical, self.clock.wall())?;

        self.events.emit(&JobEvent::PollAttempt {
            job_id: job.id().to_string(),
            attempt: self.poll_attempts,
            raw_status: report.raw_status.clone(),
            state: canonical,
            progress: report.progress.clone(),
            elapsed: self.elapsed(),
        });

        if canonical == CanonicalState::Unknown {
            self.consecutive_unknown += 1;
        } else {
            self.consecutive_unknown = 0;
        }

        match canonical {
            CanonicalState::Succeeded => {
                self.finish_succeeded(job, report)?;
                Ok(TickOutcome::Done)
            }
            CanonicalState::Failed => {
                let detail = provider_failure(&report);
                error!(job_id = %job.id(), error = %detail.message, "Provider reported failure");
                job.fail(detail)?;
                Ok(TickOutcome::Done)
            }
            CanonicalState::Unknown => self.handle_unknown(job, &report),
            CanonicalState::Queued | CanonicalState::Preparing | CanonicalState::Processing => {
                debug!(job_id = %job.id(), status = %report.raw_status, "Job still running");
                Ok(TickOutcome::Wait(self.next_delay()))
            }
        }
    }

    /// Queries the status, retrying from the job-wide budget until the deadline
    async fn query(&mut self, job_id: &str) -> framecast_client::Result<StatusReport> {
        let adapter = self.adapter;
        let queries = &mut self.status_queries;

        with_retry(
            RetryContext {
                config: &self.config.retry,
                clock: self.clock,
                events: self.events,
                operation: RemoteOperation::QueryStatus,
                budget: Some(&mut self.query_retries_left),
                deadline: Some(self.started + self.config.max_wait),
            },
            || {
                *queries += 1;
                adapter.query_status(job_id)
            },
        )
        .await
    }

    fn finish_succeeded(
        &self,
        job: &mut Job,
        report: StatusReport,
    ) -> Result<(), JobTransitionError> {
        match report.locator {
            Some(locator) => {
                info!(job_id = %job.id(), "Generation succeeded");
                job.succeed(locator)
            }
            None => {
                error!(job_id = %job.id(), "Job succeeded without a result reference");
                job.fail(
                    JobError::new(
                        FailureKind::UnexpectedResponse,
                        "Provider reported success without a result reference",
                    )
                    .with_raw(Some(report.raw)),
                )
            }
        }
    }

    fn handle_unknown(
        &self,
        job: &mut Job,
        report: &StatusReport,
    ) -> Result<TickOutcome, JobTransitionError> {
        warn!(
            job_id = %job.id(),
            raw_status = %report.raw_status,
            consecutive = self.consecutive_unknown,
            "Unrecognized status from provider"
        );
        self.events.emit(&JobEvent::UnrecognizedStatus {
            job_id: job.id().to_string(),
            raw_status: report.raw_status.clone(),
            consecutive: self.consecutive_unknown,
        });

        match self.config.unknown_status {
            UnknownStatusPolicy::FailAfter(limit) if self.consecutive_unknown >= limit => {
                let message = format!(
                    "Unrecognized status '{}' reported {} time(s) in a row",
                    report.raw_status, self.consecutive_unknown
                );
                job.fail(
                    JobError::new(FailureKind::UnrecognizedStatus, message)
                        .with_raw(Some(report.raw.clone())),
                )?;
                Ok(TickOutcome::Done)
            }
            _ => Ok(TickOutcome::Wait(self.next_delay())),
        }
    }

    fn time_out(&self, job: &mut Job) -> Result<(), JobTransitionError> {
        let elapsed = self.elapsed();
        warn!(
            job_id = %job.id(),
            elapsed_s = elapsed.as_secs(),
            last_status = job.raw_status().unwrap_or("-"),
            "Timed out waiting for job"
        );
        let message = format!(
            "No terminal status after {}s (last status: {})",
            elapsed.as_secs(),
            job.raw_status().unwrap_or("none")
        );
        job.time_out(JobError::new(FailureKind::Timeout, message))
    }

    fn cancel(&self, job: &mut Job) -> Result<(), JobTransitionError> {
        info!(job_id = %job.id(), "Job cancelled");
        job.cancel(JobError::new(
            FailureKind::Cancelled,
            "Cancelled before the job finished",
        ))
    }

    /// Poll interval, shortened so the last wait ends exactly at the budget
    fn next_delay(&self) -> Duration {
        let remaining = self.config.max_wait.saturating_sub(self.elapsed());
        self.config.poll_interval.min(remaining)
    }
}

/// Builds the failure detail for an explicit provider failure status
fn provider_failure(report: &StatusReport) -> JobError {
    let (message, code) = match &report.error_detail {
        Some(detail) if !detail.message.trim().is_empty() => {
            (detail.message.clone(), detail.code.clone())
        }
        Some(detail) => (
            format!("Provider reported status '{}'", report.raw_status),
            detail.code.clone(),
        ),
        None => (
            format!("Provider reported status '{}'", report.raw_status),
            None,
        ),
    };

    let error = JobError::new(FailureKind::ProviderReportedFailure, message)
        .with_raw(Some(report.raw.clone()));
    match code {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RetryConfig;
    use crate::service::InMemoryEventSink;
    use async_trait::async_trait;
    use framecast_client::{AdapterError, ArtifactStream, ProviderErrorDetail};
    use framecast_core::dto::job::JobRequest;
    use framecast_core::{JobState, ProviderKind, ResultLocator};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Adapter answering status queries from a script
    struct Scripted {
        answers: Mutex<VecDeque<framecast_client::Result<StatusReport>>>,
        repeat_last: Option<String>,
    }

    impl Scripted {
        fn new(answers: Vec<framecast_client::Result<StatusReport>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                repeat_last: None,
            }
        }

        fn always(status: &str) -> Self {
            Self {
                answers: Mutex::new(VecDeque::new()),
                repeat_last: Some(status.to_string()),
            }
        }
    }

    fn report(status: &str) -> StatusReport {
        StatusReport {
            raw_status: status.to_string(),
            locator: None,
            error_detail: None,
            progress: None,
            raw: json!({ "status": status }),
        }
    }

    #[async_trait]
    impl ProviderAdapter for Scripted {
        fn provider(&self) -> ProviderKind {
            ProviderKind::MiniMax
        }

        async fn submit(&self, _request: &JobRequest) -> framecast_client::Result<String> {
            Ok("job-1".to_string())
        }

        async fn query_status(&self, _job_id: &str) -> framecast_client::Result<StatusReport> {
            let next = self.answers.lock().unwrap().pop_front();
            match (next, &self.repeat_last) {
                (Some(answer), _) => answer,
                (None, Some(status)) => Ok(report(status)),
                (None, None) => panic!("status script exhausted"),
            }
        }

        async fn resolve_and_fetch(
            &self,
            _locator: &ResultLocator,
        ) -> framecast_client::Result<ArtifactStream> {
            unreachable!("poller never downloads")
        }
    }

    struct Harness {
        config: PollerConfig,
        clock: ManualClock,
        events: InMemoryEventSink,
        job: Job,
    }

    impl Harness {
        fn new(config: PollerConfig) -> Self {
            let clock = ManualClock::new();
            let mut job = Job::new("job-1", ProviderKind::MiniMax, clock.wall());
            job.begin_polling().unwrap();
            Self {
                config,
                clock,
                events: InMemoryEventSink::new(),
                job,
            }
        }

        async fn run(&mut self, adapter: &Scripted) -> (u32, u32) {
            let mut poller = StatusPoller::new(
                adapter,
                &self.config,
                &self.clock,
                &self.events,
                self.clock.now(),
            );
            poller
                .run(&mut self.job, &CancellationToken::new())
                .await
                .unwrap();
            (poller.poll_attempts(), poller.status_queries())
        }
    }

    fn config(interval: u64, max_wait: u64) -> PollerConfig {
        PollerConfig::new(Duration::from_secs(interval), Duration::from_secs(max_wait))
    }

    #[tokio::test]
    async fn test_polls_until_success() {
        let mut done = report("Success");
        done.locator = ResultLocator::new("file-9");
        let adapter = Scripted::new(vec![
            Ok(report("Queueing")),
            Ok(report("Processing")),
            Ok(done),
        ]);
        let mut harness = Harness::new(config(10, 600));

        let (attempts, queries) = harness.run(&adapter).await;

        assert_eq!(attempts, 3);
        assert_eq!(queries, 3);
        assert_eq!(harness.job.state(), JobState::Succeeded);
        assert_eq!(harness.job.result_locator().unwrap().as_str(), "file-9");
        assert_eq!(harness.clock.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_vendor_detail() {
        let mut failed = report("Fail");
        failed.error_detail = Some(ProviderErrorDetail {
            code: Some("1026".to_string()),
            message: "content policy violation".to_string(),
        });
        let adapter = Scripted::new(vec![Ok(failed)]);
        let mut harness = Harness::new(config(10, 600));

        harness.run(&adapter).await;

        let error = harness.job.error().unwrap();
        assert_eq!(harness.job.state(), JobState::Failed);
        assert_eq!(error.kind, FailureKind::ProviderReportedFailure);
        assert_eq!(error.message, "content policy violation");
        assert_eq!(error.provider_code.as_deref(), Some("1026"));
        assert_eq!(error.raw.as_ref().unwrap()["status"], "Fail");
    }

    #[tokio::test]
    async fn test_success_without_locator_fails() {
        let adapter = Scripted::new(vec![Ok(report("Success"))]);
        let mut harness = Harness::new(config(10, 600));

        harness.run(&adapter).await;

        assert_eq!(harness.job.state(), JobState::Failed);
        assert!(harness.job.result_locator().is_none());
        assert_eq!(
            harness.job.error().unwrap().kind,
            FailureKind::UnexpectedResponse
        );
    }

    #[tokio::test]
    async fn test_timeout_after_budget() {
        let adapter = Scripted::always("Processing");
        let mut harness = Harness::new(config(10, 30));

        let (attempts, _) = harness.run(&adapter).await;

        assert_eq!(attempts, 3);
        assert_eq!(harness.job.state(), JobState::TimedOut);
        assert_eq!(harness.job.error().unwrap().kind, FailureKind::Timeout);
        assert_eq!(harness.clock.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_last_wait_is_shortened_to_budget() {
        let adapter = Scripted::always("Processing");
        let mut harness = Harness::new(config(10, 25));

        let (attempts, _) = harness.run(&adapter).await;

        assert_eq!(attempts, 3);
        assert_eq!(
            harness.clock.sleeps(),
            vec![
                Duration::from_secs(10),
                Duration::from_secs(10),
                Duration::from_secs(5)
            ]
        );
        assert!(attempts <= harness.config.max_poll_ticks());
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_polling_by_default() {
        let mut done = report("Success");
        done.locator = ResultLocator::new("file-1");
        let adapter = Scripted::new(vec![Ok(report("Unknown")), Ok(report("Unknown")), Ok(done)]);
        let mut harness = Harness::new(config(10, 600));

        harness.run(&adapter).await;

        assert_eq!(harness.job.state(), JobState::Succeeded);
        let unknown: Vec<u32> = harness
            .events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::UnrecognizedStatus { consecutive, .. } => Some(consecutive),
                _ => None,
            })
            .collect();
        assert_eq!(unknown, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_status_fails_after_threshold() {
        let adapter = Scripted::new(vec![
            Ok(report("Unknown")),
            Ok(report("Processing")),
            Ok(report("Unknown")),
            Ok(report("Unknown")),
        ]);
        let mut harness = Harness::new(
            config(10, 600).with_unknown_status(UnknownStatusPolicy::FailAfter(2)),
        );

        let (attempts, _) = harness.run(&adapter).await;

        assert_eq!(attempts, 4);
        assert_eq!(harness.job.state(), JobState::Failed);
        assert_eq!(
            harness.job.error().unwrap().kind,
            FailureKind::UnrecognizedStatus
        );
    }

    #[tokio::test]
    async fn test_transient_query_failures_are_retried() {
        let mut done = report("Success");
        done.locator = ResultLocator::new("file-1");
        let adapter = Scripted::new(vec![
            Err(AdapterError::from_status(503, "busy")),
            Err(AdapterError::from_status(502, "bad gateway")),
            Ok(done),
        ]);
        let mut harness = Harness::new(config(10, 600));

        let (attempts, queries) = harness.run(&adapter).await;

        assert_eq!(attempts, 1);
        assert_eq!(queries, 3);
        assert_eq!(harness.job.state(), JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_network_error() {
        let adapter = Scripted::new(vec![
            Err(AdapterError::from_status(503, "busy")),
            Err(AdapterError::from_status(503, "busy")),
        ]);
        let mut harness = Harness::new(config(10, 600).with_retry(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        }));

        let (_, queries) = harness.run(&adapter).await;

        assert_eq!(queries, 2);
        assert_eq!(harness.job.state(), JobState::Failed);
        assert_eq!(
            harness.job.error().unwrap().kind,
            FailureKind::TransientNetworkError
        );
    }

    #[tokio::test]
    async fn test_query_retries_share_one_budget_per_job() {
        let busy = || Err(AdapterError::from_status(503, "busy"));
        let adapter = Scripted::new(vec![
            busy(),
            Ok(report("Processing")),
            busy(),
            Ok(report("Processing")),
            busy(),
            Ok(report("Processing")),
            busy(),
        ]);
        let mut harness = Harness::new(config(10, 60));
        let budget = harness.config.retry.max_attempts;

        let (attempts, queries) = harness.run(&adapter).await;

        // three retried ticks use up the budget; the fourth failure is final
        assert_eq!(attempts, 4);
        assert_eq!(queries, attempts + budget);
        assert!(queries <= harness.config.max_poll_ticks() + budget);
        assert_eq!(
            harness.job.error().unwrap().kind,
            FailureKind::TransientNetworkError
        );
    }

    #[tokio::test]
    async fn test_retry_backoff_never_passes_deadline() {
        let busy = || Err(AdapterError::from_status(503, "busy"));
        let adapter = Scripted::new(vec![
            Ok(report("Processing")),
            Ok(report("Processing")),
            busy(),
            busy(),
            busy(),
            Ok(report("Processing")),
        ]);
        let mut harness = Harness::new(config(10, 30));

        harness.run(&adapter).await;

        assert_eq!(harness.job.state(), JobState::TimedOut);
        assert_eq!(harness.clock.elapsed(), Duration::from_secs(30));
        assert_eq!(
            harness.clock.sleeps(),
            vec![
                Duration::from_secs(10),
                Duration::from_secs(10),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(4),
                Duration::ZERO
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_query_at_deadline_times_out() {
        let adapter = Scripted::new(
            (0..5)
                .map(|_| Err(AdapterError::from_status(503, "busy")))
                .collect(),
        );
        let mut harness = Harness::new(config(10, 10).with_retry(RetryConfig {
            max_attempts: 5,
            ..RetryConfig::default()
        }));

        let (_, queries) = harness.run(&adapter).await;

        assert_eq!(queries, 4);
        assert_eq!(harness.job.state(), JobState::TimedOut);
        assert_eq!(harness.job.error().unwrap().kind, FailureKind::Timeout);
        assert_eq!(harness.clock.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_auth_failure_during_polling_is_not_retried() {
        let adapter = Scripted::new(vec![Err(AdapterError::from_status(401, "expired key"))]);
        let mut harness = Harness::new(config(10, 600));

        let (_, queries) = harness.run(&adapter).await;

        assert_eq!(queries, 1);
        assert_eq!(
            harness.job.error().unwrap().kind,
            FailureKind::AuthenticationError
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_tick() {
        let adapter = Scripted::always("Processing");
        let mut harness = Harness::new(config(10, 600));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut poller = StatusPoller::new(
            &adapter,
            &harness.config,
            &harness.clock,
            &harness.events,
            harness.clock.now(),
        );
        let outcome = poller.tick(&mut harness.job, &cancel).await.unwrap();

        assert_eq!(outcome, TickOutcome::Done);
        assert_eq!(poller.status_queries(), 0);
        assert_eq!(harness.job.state(), JobState::Cancelled);
        assert_eq!(harness.job.error().unwrap().kind, FailureKind::Cancelled);
    }

    #[tokio::test]
    async fn test_tick_requires_polling_state() {
        let adapter = Scripted::always("Processing");
        let clock = ManualClock::new();
        let events = InMemoryEventSink::new();
        let config = config(10, 600);
        let mut job = Job::new("job-1", ProviderKind::MiniMax, clock.wall());

        let mut poller = StatusPoller::new(&adapter, &config, &clock, &events, clock.now());
        let result = poller.tick(&mut job, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(JobTransitionError::WrongState { .. })
        ));
    }
}
