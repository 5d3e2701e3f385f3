//! Table output for plans and execution reports using comfy-table.

use std::env;

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};

use crate::domain::models::{ExecutionReport, TaskStatus};
use crate::services::PlanDocument;

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl TableFormatter {
    /// Formatter that colors output when the terminal supports it.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    /// Formatter with colors forced on or off.
    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// One row per task, grouped by level.
    pub fn format_plan(&self, plan: &PlanDocument) -> String {
        let mut table = base_table();
        table.set_header(header(&["Level", "Task", "Title", "Worker", "Minutes", "Depends on"]));

        for level in &plan.levels {
            for task in &level.tasks {
                let deps = if task.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    task.dependencies.join(", ")
                };
                table.add_row(vec![
                    Cell::new(level.level),
                    Cell::new(&task.id),
                    Cell::new(truncate(&task.title, 48)),
                    Cell::new(task.assigned_worker),
                    Cell::new(task.estimated_duration),
                    Cell::new(deps),
                ]);
            }
        }

        table.to_string()
    }

    /// One row per task result.
    pub fn format_results(&self, report: &ExecutionReport) -> String {
        let mut table = base_table();
        table.set_header(header(&["Task", "Status", "Worker", "Duration (ms)", "Error"]));

        for result in &report.tasks {
            let status = if self.use_colors {
                Cell::new(result.status).fg(status_color(result.status))
            } else {
                Cell::new(format!("{} {}", status_icon(result.status), result.status))
            };
            table.add_row(vec![
                Cell::new(&result.task_id),
                status,
                Cell::new(result.worker_type),
                Cell::new(result.duration_ms),
                Cell::new(result.error.as_deref().map_or_else(|| "-".to_string(), |e| truncate(e, 60))),
            ]);
        }

        table.to_string()
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::Running => Color::Cyan,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Escalated => Color::Magenta,
        TaskStatus::Idle => Color::White,
    }
}

fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✓",
        TaskStatus::Running => "⟳",
        TaskStatus::Failed => "✗",
        TaskStatus::Escalated => "⚠",
        TaskStatus::Idle => "○",
    }
}
