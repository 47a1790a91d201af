//! Job orchestrator
//!
//! End-to-end driver for one request: submit, poll until terminal, download
//! on success. Every exit path produces a [`JobOutcome`] carrying the
//! collected [`JobStats`]; nothing escapes as an error.

use framecast_client::{AdapterError, ProviderAdapter};
use framecast_core::domain::event::{JobEvent, RemoteOperation};
use framecast_core::domain::outcome::{JobOutcome, JobStats};
use framecast_core::dto::job::JobRequest;
use framecast_core::{FailureKind, Job, JobError, JobState, JobTransitionError};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::{ConfigError, PollerConfig};
use crate::retry::{RetryContext, with_retry};
use crate::scheduler::StatusPoller;
use crate::service::{EventSink, FetchError, ResultFetcher, TracingEventSink};

/// Runs jobs against one provider
///
/// Holds no per-job state: independent requests can run concurrently on the
/// same orchestrator.
pub struct JobOrchestrator {
    adapter: Arc<dyn ProviderAdapter>,
    config: PollerConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    fetcher: ResultFetcher,
}

impl JobOrchestrator {
    /// Creates an orchestrator on real time that logs events through tracing
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        config: PollerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            adapter,
            config,
            clock: Arc::new(TokioClock),
            events: Arc::new(TracingEventSink),
            fetcher: ResultFetcher::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Drives `request` to a final outcome
    ///
    /// Cancelling `cancel` stops the flow at the next suspension point; a
    /// partially downloaded file is never left behind.
    pub async fn run(&self, request: JobRequest, cancel: CancellationToken) -> JobOutcome {
        let mut run = RunState::new(self.clock.now());

        let outcome = self.drive(&request, &cancel, &mut run).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Job lifecycle violated");
                let detail = JobError::new(FailureKind::UnexpectedResponse, e.to_string());
                JobOutcome::failure(run.job_id.clone(), detail, JobStats::default())
            }
        };

        self.finish(outcome, &mut run)
    }

    async fn drive(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
        run: &mut RunState,
    ) -> Result<JobOutcome, JobTransitionError> {
        let provider = self.adapter.provider();
        let destination = request.output_path.as_path();

        // Refuse before spending provider credits on a job we could not save
        if let Err(e) = ResultFetcher::ensure_vacant(destination).await {
            let detail = JobError::new(FailureKind::InvalidRequestError, e.to_string());
            return Ok(JobOutcome::failure(None, detail, JobStats::default()));
        }

        if cancel.is_cancelled() {
            return Ok(cancelled(None, "Cancelled before submission"));
        }

        info!(provider = %provider, prompt = %request.prompt, "Submitting job");

        let submit_started = self.clock.now();
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled(None, "Cancelled during submission")),
            result = self.submit(request) => result,
        };
        run.stats.submission_latency = Some(self.clock.now() - submit_started);

        let job_id = match submitted {
            Ok(job_id) => job_id,
            Err(e) => {
                error!(provider = %provider, error = %e, "Submission failed");
                return Ok(JobOutcome::failure(None, e.to_job_error(), JobStats::default()));
            }
        };
        run.job_id = Some(job_id.clone());

        let mut job = Job::new(job_id.clone(), provider, self.clock.wall());
        self.events.emit(&JobEvent::Submitted {
            provider,
            job_id: job_id.clone(),
            at: job.submitted_at(),
            latency: run.stats.submission_latency.unwrap_or_default(),
        });

        job.begin_polling()?;
        let generation_started = self.clock.now();
        let mut poller = StatusPoller::new(
            self.adapter.as_ref(),
            &self.config,
            self.clock.as_ref(),
            self.events.as_ref(),
            generation_started,
        );
        let polled = poller.run(&mut job, cancel).await;

        let generation_duration = self.clock.now() - generation_started;
        run.stats.generation_duration = Some(generation_duration);
        run.stats.poll_attempts = poller.poll_attempts();
        run.stats.status_queries = poller.status_queries();
        polled?;

        self.events.emit(&JobEvent::GenerationFinished {
            job_id: job_id.clone(),
            state: job.state(),
            duration: generation_duration,
        });

        if job.state() != JobState::Succeeded {
            let detail = job.error().cloned().unwrap_or_else(|| {
                JobError::new(
                    FailureKind::UnexpectedResponse,
                    format!("Job ended in state {}", job.state().as_str()),
                )
            });
            return Ok(JobOutcome::failure(Some(job_id), detail, JobStats::default()));
        }

        self.deliver(&mut job, request, cancel, run).await
    }

    async fn submit(&self, request: &JobRequest) -> Result<String, AdapterError> {
        let adapter = self.adapter.as_ref();
        with_retry(
            self.retry_context(RemoteOperation::Submit),
            || adapter.submit(request),
        )
        .await
    }

    async fn deliver(
        &self,
        job: &mut Job,
        request: &JobRequest,
        cancel: &CancellationToken,
        run: &mut RunState,
    ) -> Result<JobOutcome, JobTransitionError> {
        let job_id = job.id().to_string();
        let Some(locator) = job.result_locator().cloned() else {
            let detail = JobError::new(FailureKind::UnexpectedResponse, "No result reference");
            return Ok(JobOutcome::failure(Some(job_id), detail, JobStats::default()));
        };
        let destination = request.output_path.as_path();

        self.events.emit(&JobEvent::DownloadStarted {
            job_id: job_id.clone(),
        });

        let download_started = self.clock.now();
        let adapter = self.adapter.as_ref();
        let fetcher = self.fetcher;
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = with_retry(
                self.retry_context(RemoteOperation::Download),
                || fetcher.fetch(adapter, &locator, destination),
            ) => Some(result),
        };
        let download_duration = self.clock.now() - download_started;
        run.stats.download_duration = Some(download_duration);

        match fetched {
            None => {
                warn!(job_id = %job_id, "Download cancelled");
                Ok(cancelled(Some(job_id), "Cancelled during download"))
            }
            Some(Ok(bytes)) => {
                self.events.emit(&JobEvent::DownloadFinished {
                    job_id: job_id.clone(),
                    path: destination.to_path_buf(),
                    bytes,
                    duration: download_duration,
                });
                Ok(JobOutcome::Success {
                    job_id,
                    path: destination.to_path_buf(),
                    bytes,
                    stats: JobStats::default(),
                })
            }
            Some(Err(e)) => {
                error!(job_id = %job_id, error = %e, "Result delivery failed");
                let detail = delivery_error(&e);
                job.record_delivery_failure(detail.clone())?;
                Ok(JobOutcome::failure(Some(job_id), detail, JobStats::default()))
            }
        }
    }

    fn retry_context(&self, operation: RemoteOperation) -> RetryContext<'_> {
        RetryContext::new(
            &self.config.retry,
            self.clock.as_ref(),
            self.events.as_ref(),
            operation,
        )
    }

    /// Stamps the final stats onto the outcome and reports it
    fn finish(&self, outcome: JobOutcome, run: &mut RunState) -> JobOutcome {
        run.stats.total_elapsed = self.clock.now() - run.started;
        let stats = run.stats.clone();

        let outcome = match outcome {
            JobOutcome::Success {
                job_id,
                path,
                bytes,
                ..
            } => JobOutcome::Success {
                job_id,
                path,
                bytes,
                stats,
            },
            JobOutcome::Failure {
                job_id,
                kind,
                detail,
                ..
            } => JobOutcome::Failure {
                job_id,
                kind,
                detail,
                stats,
            },
        };

        match &outcome {
            JobOutcome::Success { path, bytes, .. } => info!(
                path = %path.display(),
                bytes = bytes,
                total_s = run.stats.total_elapsed.as_secs(),
                "Job completed"
            ),
            JobOutcome::Failure { kind, detail, .. } => warn!(
                kind = %kind.as_str(),
                message = %detail.message,
                total_s = run.stats.total_elapsed.as_secs(),
                "Job did not complete"
            ),
        }

        self.events.emit(&JobEvent::Finished {
            job_id: outcome.job_id().map(str::to_string),
            failure: outcome.kind(),
            stats: outcome.stats().clone(),
        });

        outcome
    }
}

/// Figures accumulated while one request is being driven
struct RunState {
    started: Instant,
    job_id: Option<String>,
    stats: JobStats,
}

impl RunState {
    fn new(started: Instant) -> Self {
        Self {
            started,
            job_id: None,
            stats: JobStats::default(),
        }
    }
}

fn cancelled(job_id: Option<String>, message: &str) -> JobOutcome {
    JobOutcome::failure(
        job_id,
        JobError::new(FailureKind::Cancelled, message),
        JobStats::default(),
    )
}

/// Any delivery failure is reported as an unavailable result
fn delivery_error(error: &FetchError) -> JobError {
    let mut detail = JobError::new(FailureKind::ResultUnavailable, error.to_string());
    if let FetchError::Adapter(e) = error {
        detail = detail.with_raw(e.raw().cloned());
        if let Some(status) = e.status() {
            detail = detail.with_provider_code(status.to_string());
        }
    }
    detail
}
