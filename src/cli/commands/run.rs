//! `shepherd run`: execute a work item end to end with simulated workers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::adapters::{FileReportStore, SimulatedWorker, TracingNotifier};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{CommandOutput, output};
use crate::domain::models::{Config, ExecutionReport, WorkerType};
use crate::services::{ExecutionEvent, OrchestrationScheduler, WorkerRegistry};

use super::load_work_item;

/// Decompose a work item and execute it with simulated workers
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Work item file (JSON or YAML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Simulated time each task takes
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Skip writing the execution report
    #[arg(long)]
    pub no_save: bool,
}

/// Execution report printed by `shepherd run`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct RunOutput {
    /// Report of the finished run
    pub report: ExecutionReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let summary = &self.report.summary;
        let mut lines = vec![
            format!("Session {}", self.report.session_id),
            TableFormatter::new().format_results(&self.report),
            format!(
                "{}/{} completed, {} failed, {} escalated ({:.1}% success) in {} ms",
                summary.completed,
                summary.total,
                summary.failed,
                summary.escalated,
                summary.success_rate,
                self.report.total_duration_ms
            ),
        ];
        for escalation in &self.report.escalations {
            lines.push(format!(
                "! [{}] {} -> {}",
                escalation.severity, escalation.reason, escalation.target
            ));
        }
        lines.join("\n")
    }
}

fn simulated_registry(delay: Duration) -> WorkerRegistry {
    WorkerType::ALL
        .into_iter()
        .fold(WorkerRegistry::new(), |registry, worker_type| {
            registry.register_worker(SimulatedWorker::new(worker_type).with_delay(delay).shared())
        })
}

/// Run the work item in `args.file` end to end.
pub async fn execute(args: RunArgs, json_mode: bool, config: &Config) -> Result<()> {
    let work_item = load_work_item(&args.file)?;
    let registry = simulated_registry(Duration::from_millis(args.delay_ms));

    let mut scheduler = OrchestrationScheduler::new(config.scheduler.clone(), &registry)
        .with_notifier(Arc::new(TracingNotifier));
    if !args.no_save {
        scheduler = scheduler.with_report_store(Arc::new(FileReportStore::new(
            &config.persistence.reports_dir,
        )));
    }

    let (tx, mut rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json_mode {
                continue;
            }
            match event {
                ExecutionEvent::LevelStarted { level, task_count } => {
                    println!("Level {level}: {task_count} task(s)");
                }
                ExecutionEvent::LevelCompleted { level, progress } => {
                    println!(
                        "Level {level} done: {}/{} completed ({}%)",
                        progress.completed, progress.total, progress.percentage
                    );
                }
                _ => {}
            }
        }
    });

    let report = scheduler.coordinate_with_events(&work_item, tx).await?;
    printer.await?;

    output(&RunOutput { report }, json_mode);
    Ok(())
}
