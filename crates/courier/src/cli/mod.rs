mod check;
mod run;

pub use check::CheckCommand;
pub use run::RunCommand;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use courier_core::config::CourierConfig;

/// Courier - in-process background job runner
#[derive(Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the job queue with the demo handlers.
    Run(RunCommand),

    /// Validate a configuration file and print the effective settings.
    Check(CheckCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Check(cmd) => cmd.execute(),
        }
    }
}

/// Load the config file, or defaults when it does not exist.
fn load_config(path: &str) -> Result<(CourierConfig, bool)> {
    if Path::new(path).exists() {
        Ok((CourierConfig::from_file(path)?, true))
    } else {
        Ok((CourierConfig::default(), false))
    }
}
