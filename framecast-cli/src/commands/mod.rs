//! Commands module
//!
//! One subcommand per provider. Each builds a provider adapter and a
//! [`JobRequest`] from its flags and hands them to the shared job runner.

mod kling;
mod minimax;
mod run;
mod runway;

pub use kling::KlingArgs;
pub use minimax::MiniMaxArgs;
pub use runway::RunwayArgs;

use anyhow::Result;
use clap::Subcommand;
use framecast_core::domain::outcome::JobOutcome;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate with MiniMax Hailuo
    #[command(name = "minimax")]
    MiniMax(MiniMaxArgs),
    /// Generate with Kling through PiAPI
    Kling(KlingArgs),
    /// Generate with Runway
    Runway(RunwayArgs),
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
/// * `cancel` - Cancelled on Ctrl-C
///
/// # Returns
/// The job outcome, or an error if the job could not be started at all
pub async fn handle_command(
    command: Commands,
    config: &Config,
    cancel: CancellationToken,
) -> Result<JobOutcome> {
    match command {
        Commands::MiniMax(args) => minimax::handle(args, config, cancel).await,
        Commands::Kling(args) => kling::handle(args, config, cancel).await,
        Commands::Runway(args) => runway::handle(args, config, cancel).await,
    }
}
