//! `shepherd config`: print the effective configuration.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{CommandOutput, output};
use crate::domain::models::Config;

/// Show the effective configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {}

/// Effective configuration, printed as YAML for humans.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    /// Merged configuration
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

/// Print the effective configuration.
pub async fn execute(_args: ConfigArgs, json_mode: bool, config: &Config) -> Result<()> {
    output(
        &ConfigOutput {
            config: config.clone(),
        },
        json_mode,
    );
    Ok(())
}
