use anyhow::{bail, Result};
use clap::Parser;
use console::style;

use super::load_config;

/// Validate a configuration file.
#[derive(Parser)]
pub struct CheckCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "courier.toml")]
    pub config: String,
}

impl CheckCommand {
    /// Execute the check command.
    pub fn execute(self) -> Result<()> {
        let (config, found) = load_config(&self.config)?;
        if !found {
            bail!("Configuration file not found: {}", self.config);
        }

        println!("{}", config.to_toml()?);
        println!("{} {} is valid", style("✔").green().bold(), self.config);
        Ok(())
    }
}
