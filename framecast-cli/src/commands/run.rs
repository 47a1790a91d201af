//! Shared job execution for the provider commands

use anyhow::{Context, Result};
use colored::*;
use framecast_client::ProviderAdapter;
use framecast_core::domain::outcome::JobOutcome;
use framecast_core::dto::job::JobRequest;
use framecast_runner::JobOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::naming::default_output_path;
use crate::reporter::ConsoleReporter;

/// Where the video goes: `--output` if given, else a generated path
pub fn output_path(
    config: &Config,
    adapter: &dyn ProviderAdapter,
    prompt: &str,
    model: &str,
    mode: Option<&str>,
) -> PathBuf {
    match &config.output {
        Some(path) => path.clone(),
        None => default_output_path(&config.output_dir, adapter.provider(), prompt, model, mode),
    }
}

/// Runs one job to completion and reports the result
pub async fn run_job(
    adapter: Arc<dyn ProviderAdapter>,
    request: JobRequest,
    config: &Config,
    cancel: CancellationToken,
) -> Result<JobOutcome> {
    let provider = adapter.provider();
    let mut orchestrator = JobOrchestrator::new(adapter, config.poller.clone())
        .context("Invalid polling options")?;

    if !config.json {
        println!(
            "{} {} -> {}",
            "Generating with".bold(),
            provider.display_name(),
            request.output_path.display()
        );
        orchestrator = orchestrator.with_event_sink(Arc::new(ConsoleReporter::new()));
    }

    let outcome = orchestrator.run(request, cancel).await;

    if config.json {
        let rendered =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{}", rendered);
    } else {
        ConsoleReporter::print_outcome(&outcome);
    }

    Ok(outcome)
}
