//! Framecast CLI
//!
//! Command-line front end that turns a still image and a prompt into a video
//! through one of the supported providers.

mod commands;
mod config;
mod image;
mod naming;
mod reporter;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use config::{Config, GlobalArgs};

#[derive(Parser)]
#[command(name = "framecast")]
#[command(about = "Generate videos from images with hosted image-to-video APIs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine; keys may come from the real environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.global.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_args(&cli.global)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling job");
            ctrl_c.cancel();
        }
    });

    let outcome = handle_command(cli.command, &config, cancel).await?;

    if outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
