//! Configuration module
//!
//! Options shared by every provider command: where the video goes, how
//! often to poll, how long to wait and how output is rendered.

use anyhow::{Context, Result};
use clap::Args;
use framecast_runner::{PollerConfig, RetryConfig, UnknownStatusPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Flags accepted before the provider subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Exact path to save the video (default: generated under --output-dir)
    #[arg(long, global = true, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for generated file names
    #[arg(long, global = true, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Seconds between status checks
    #[arg(long, global = true, default_value_t = 10)]
    pub poll_interval: u64,

    /// Give up after this many seconds without a final status
    #[arg(long, global = true, default_value_t = 1200)]
    pub max_wait: u64,

    /// Fail after this many consecutive unrecognized statuses (default: keep polling)
    #[arg(long, global = true, value_name = "N")]
    pub fail_on_unknown: Option<u32>,

    /// Retries for transient network and server errors, per request
    #[arg(long, global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Print the final outcome as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Show runner logs on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "framecast=warn",
            1 => "framecast=info",
            _ => "framecast=debug",
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit destination, if the user gave one
    pub output: Option<PathBuf>,

    /// Root for generated destinations
    pub output_dir: PathBuf,

    pub poller: PollerConfig,

    /// Emit the outcome as JSON instead of a colored summary
    pub json: bool,
}

impl Config {
    /// Builds and validates the configuration from parsed flags
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let unknown_status = match args.fail_on_unknown {
            Some(n) => UnknownStatusPolicy::FailAfter(n),
            None => UnknownStatusPolicy::KeepPolling,
        };

        let poller = PollerConfig::new(
            Duration::from_secs(args.poll_interval),
            Duration::from_secs(args.max_wait),
        )
        .with_retry(RetryConfig {
            max_attempts: args.max_retries,
            ..RetryConfig::default()
        })
        .with_unknown_status(unknown_status);

        poller.validate().context("Invalid polling options")?;

        Ok(Self {
            output: args.output.clone(),
            output_dir: args.output_dir.clone(),
            poller,
            json: args.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    fn parse(args: &[&str]) -> GlobalArgs {
        let mut argv = vec!["framecast"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).global
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(&parse(&[])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.poller.poll_interval, Duration::from_secs(10));
        assert_eq!(config.poller.max_wait, Duration::from_secs(1200));
        assert_eq!(config.poller.unknown_status, UnknownStatusPolicy::KeepPolling);
        assert_eq!(config.poller.retry.max_attempts, 3);
        assert!(!config.json);
    }

    #[test]
    fn test_fail_on_unknown_sets_policy() {
        let config = Config::from_args(&parse(&["--fail-on-unknown", "2"])).unwrap();
        assert_eq!(
            config.poller.unknown_status,
            UnknownStatusPolicy::FailAfter(2)
        );
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let args = parse(&["--poll-interval", "30", "--max-wait", "10"]);
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn test_verbosity_controls_filter() {
        assert_eq!(parse(&[]).default_log_filter(), "framecast=warn");
        assert_eq!(parse(&["-vv"]).default_log_filter(), "framecast=debug");
    }
}
