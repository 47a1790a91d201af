//! Runway command

use anyhow::Result;
use clap::Args;
use framecast_client::RunwayAdapter;
use framecast_client::runway::{DEFAULT_MODEL, DEFAULT_RATIO};
use framecast_core::domain::outcome::JobOutcome;
use framecast_core::dto::job::{GenerationOptions, JobRequest};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::run::{output_path, run_job};
use crate::config::Config;
use crate::image::ImageArgs;

/// Runway options
#[derive(Debug, Args)]
pub struct RunwayArgs {
    /// Text prompt guiding the video
    #[arg(long)]
    pub prompt: String,

    #[command(flatten)]
    pub image: ImageArgs,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Clip length in seconds
    #[arg(long, default_value_t = 5)]
    pub duration: u32,

    /// Output resolution as width:height
    #[arg(long, default_value = DEFAULT_RATIO)]
    pub ratio: String,

    /// Seed for reproducible results
    #[arg(long)]
    pub seed: Option<u64>,

    /// Runway API secret
    #[arg(long, env = "RUNWAY_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Override the API base URL
    #[arg(long, hide = true)]
    pub base_url: Option<String>,
}

pub async fn handle(
    args: RunwayArgs,
    config: &Config,
    cancel: CancellationToken,
) -> Result<JobOutcome> {
    let mut adapter = RunwayAdapter::new(args.api_key);
    if let Some(base_url) = args.base_url {
        adapter = adapter.with_base_url(base_url);
    }

    let mut extra = Map::new();
    if let Some(seed) = args.seed {
        extra.insert("seed".to_string(), Value::from(seed));
    }

    let output = output_path(config, &adapter, &args.prompt, &args.model, None);
    let request = JobRequest::new(args.prompt, output)
        .with_image(args.image.load()?)
        .with_options(GenerationOptions {
            model: Some(args.model),
            duration_secs: Some(args.duration),
            aspect_ratio: Some(args.ratio),
            extra,
            ..Default::default()
        });

    run_job(Arc::new(adapter), request, config, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunwayArgs,
    }

    fn parse(extra: &[&str]) -> Result<RunwayArgs, clap::Error> {
        let mut argv = vec!["cmd", "--prompt", "a fox", "--api-key", "key"];
        argv.extend_from_slice(extra);
        TestCli::try_parse_from(argv).map(|cli| cli.args)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--image-url", "https://example.com/a.jpg"]).unwrap();
        assert_eq!(args.model, "gen3a_turbo");
        assert_eq!(args.ratio, "1280:768");
        assert_eq!(args.duration, 5);
        assert!(args.seed.is_none());
    }

    #[test]
    fn test_image_source_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_image_sources_are_exclusive() {
        let result = parse(&["--image", "a.png", "--image-url", "https://example.com/a.jpg"]);
        assert!(result.is_err());
    }
}
