//! MiniMax Hailuo command

use anyhow::Result;
use clap::Args;
use framecast_client::MiniMaxAdapter;
use framecast_client::minimax::DEFAULT_MODEL;
use framecast_core::domain::outcome::JobOutcome;
use framecast_core::dto::job::{GenerationOptions, JobRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::run::{output_path, run_job};
use crate::config::Config;
use crate::image::ImageArgs;

/// MiniMax Hailuo options
#[derive(Debug, Args)]
pub struct MiniMaxArgs {
    /// Text prompt guiding the video
    #[arg(long)]
    pub prompt: String,

    #[command(flatten)]
    pub image: ImageArgs,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// MiniMax API key
    #[arg(long, env = "MINIMAX_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Override the API base URL
    #[arg(long, hide = true)]
    pub base_url: Option<String>,
}

pub async fn handle(
    args: MiniMaxArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<JobOutcome> {
    let mut adapter = MiniMaxAdapter::new(args.api_key);
    if let Some(base_url) = args.base_url {
        adapter = adapter.with_base_url(base_url);
    }

    let output = output_path(config, &adapter, &args.prompt, &args.model, None);
    let request = JobRequest::new(args.prompt, output)
        .with_image(args.image.load()?)
        .with_options(GenerationOptions {
            model: Some(args.model),
            ..Default::default()
        });

    run_job(Arc::new(adapter), request, config, cancel).await
}
