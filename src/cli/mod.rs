//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, plan::PlanArgs, run::RunArgs};

/// Top-level command line arguments.
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(about = "Shepherd - dependency-aware task orchestration with feedback loops", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .shepherd/config.yaml layering)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Raise the log level to at least debug
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompose a work item and show its execution plan
    Plan(PlanArgs),
    /// Decompose a work item and execute it with simulated workers
    Run(RunArgs),
    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Print an error in the selected output mode and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "chain": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
