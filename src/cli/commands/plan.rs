//! `shepherd plan`: decompose a work item and show the execution plan.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{CommandOutput, output};
use crate::domain::models::{Config, CriticalPath};
use crate::services::{Decomposer, DependencyGraphBuilder, PlanDocument};

use super::load_work_item;

/// Decompose a work item and show its execution plan
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Work item file (JSON or YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Print the plan as a markdown document (takes precedence over --json)
    #[arg(long)]
    pub markdown: bool,
}

/// Structured plan printed by `shepherd plan`.
#[derive(Debug, Serialize)]
pub struct PlanOutput {
    /// Work item number
    pub work_item: u64,
    /// Number of extracted tasks
    pub task_count: usize,
    /// Summed estimates in minutes
    pub estimated_total_duration: u32,
    /// Task ids per level
    pub levels: Vec<Vec<String>>,
    /// Ids stuck in a cycle
    pub unresolved: Vec<String>,
    /// Whether a cycle was found
    pub has_cycles: bool,
    /// Longest duration-weighted chain
    pub critical_path: CriticalPath,
    /// Advisory notes on the plan shape
    pub recommendations: Vec<String>,
    #[serde(skip)]
    document: PlanDocument,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "Work item #{}: {} task(s) in {} level(s), ~{} min",
                self.work_item,
                self.task_count,
                self.levels.len(),
                self.estimated_total_duration
            ),
            TableFormatter::new().format_plan(&self.document),
        ];

        if self.has_cycles {
            lines.push(format!("Unresolved (cyclic): {}", self.unresolved.join(", ")));
        }
        if !self.critical_path.task_ids.is_empty() {
            lines.push(format!(
                "Critical path: {} ({} min)",
                self.critical_path.task_ids.join(" -> "),
                self.critical_path.duration_minutes
            ));
        }
        for recommendation in &self.recommendations {
            lines.push(format!("* {recommendation}"));
        }

        lines.join("\n")
    }
}

/// Decompose the work item in `args.file` and print its plan.
pub async fn execute(args: PlanArgs, json_mode: bool, config: &Config) -> Result<()> {
    let work_item = load_work_item(&args.file)?;
    let graph_builder = DependencyGraphBuilder::from_config(&config.scheduler);
    let decomposition = Decomposer::new(graph_builder.clone()).decompose(&work_item)?;
    let document = PlanDocument::generate(&work_item, &decomposition.graph);

    if args.markdown {
        println!("{}", document.to_markdown());
        return Ok(());
    }

    let result = PlanOutput {
        work_item: work_item.number,
        task_count: decomposition.tasks.len(),
        estimated_total_duration: decomposition.estimated_total_duration,
        levels: decomposition.graph.levels.clone(),
        unresolved: decomposition.graph.unresolved.clone(),
        has_cycles: decomposition.has_cycles,
        critical_path: graph_builder.calculate_critical_path(&decomposition.graph),
        recommendations: decomposition.recommendations,
        document,
    };

    output(&result, json_mode);
    Ok(())
}
