//! PiAPI Kling command

use anyhow::Result;
use clap::Args;
use framecast_client::KlingAdapter;
use framecast_client::kling::{
    DEFAULT_ASPECT_RATIO, DEFAULT_DURATION_SECS, DEFAULT_MODE, DEFAULT_VERSION,
};
use framecast_core::domain::outcome::JobOutcome;
use framecast_core::dto::job::{GenerationOptions, ImageInput, JobRequest};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::run::{output_path, run_job};
use crate::config::Config;

/// Kling options
///
/// PiAPI fetches the image itself, so only a hosted image URL is accepted.
#[derive(Debug, Args)]
pub struct KlingArgs {
    /// Text prompt guiding the video
    #[arg(long)]
    pub prompt: String,

    /// URL of the source image
    #[arg(long)]
    pub image_url: String,

    /// Kling model version
    #[arg(
        long,
        default_value = DEFAULT_VERSION,
        value_parser = ["1.0", "1.5", "1.6", "2.0", "2.1"]
    )]
    pub model: String,

    /// Quality mode
    #[arg(long, default_value = DEFAULT_MODE, value_parser = ["std", "pro"])]
    pub mode: String,

    /// Clip length in seconds
    #[arg(long, default_value_t = DEFAULT_DURATION_SECS, value_parser = parse_duration)]
    pub duration: u32,

    /// Aspect ratio
    #[arg(long, default_value = DEFAULT_ASPECT_RATIO, value_parser = ["16:9", "9:16", "1:1"])]
    pub aspect_ratio: String,

    /// Things the video should avoid
    #[arg(long)]
    pub negative_prompt: Option<String>,

    /// Prompt adherence between 0 and 1
    #[arg(long)]
    pub cfg_scale: Option<f64>,

    /// PiAPI key
    #[arg(long, env = "PIAPI_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Override the API base URL
    #[arg(long, hide = true)]
    pub base_url: Option<String>,
}

/// Kling renders 5 or 10 second clips only
fn parse_duration(value: &str) -> Result<u32, String> {
    match value {
        "5" => Ok(5),
        "10" => Ok(10),
        other => Err(format!("duration must be 5 or 10, got '{}'", other)),
    }
}

pub async fn handle(
    args: KlingArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<JobOutcome> {
    let mut adapter = KlingAdapter::new(args.api_key);
    if let Some(base_url) = args.base_url {
        adapter = adapter.with_base_url(base_url);
    }

    let mut extra = Map::new();
    if let Some(cfg_scale) = args.cfg_scale {
        extra.insert("cfg_scale".to_string(), Value::from(cfg_scale));
    }

    let output = output_path(config, &adapter, &args.prompt, &args.model, Some(&args.mode));
    let request = JobRequest::new(args.prompt, output)
        .with_image(ImageInput::Url(args.image_url))
        .with_options(GenerationOptions {
            model: Some(args.model),
            duration_secs: Some(args.duration),
            aspect_ratio: Some(args.aspect_ratio),
            mode: Some(args.mode),
            negative_prompt: args.negative_prompt,
            extra,
        });

    run_job(Arc::new(adapter), request, config, cancel).await
}
