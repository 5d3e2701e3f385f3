//! Shepherd CLI entry point.

use anyhow::Result;
use clap::Parser;

use shepherd::cli::{Cli, Commands, commands, handle_error};
use shepherd::domain::models::Config;
use shepherd::infrastructure::config::ConfigLoader;
use shepherd::infrastructure::logging::{LogSettings, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = load_config(&cli).unwrap_or_else(|err| handle_error(err, cli.json));

    let logger = LogSettings::from_config(&config.logging)
        .map(|settings| if cli.verbose { settings.verbose() } else { settings })
        .and_then(|settings| LoggerImpl::init(&settings))
        .unwrap_or_else(|err| handle_error(err, cli.json));

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, cli.json, &config).await,
        Commands::Run(args) => commands::run::execute(args, cli.json, &config).await,
        Commands::Config(args) => commands::config::execute(args, cli.json, &config).await,
    };

    if let Err(err) = result {
        // Flush file logs before exiting.
        drop(logger);
        handle_error(err, cli.json);
    }
}
