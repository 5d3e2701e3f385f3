//! Living plan document for a decomposed work item.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::models::{DependencyGraph, Task, TaskStatus, WorkItem, total_duration};

static OVERVIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)##\s+Overview\s*\r?\n([^\r\n]+(?:\r?\n[^\r\n]+)?)").expect("valid regex")
});

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tasks of one graph level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLevel {
    /// Level index, 0 first
    pub level: usize,
    /// Tasks of this level
    pub tasks: Vec<Task>,
    /// More than one task in the level
    pub can_run_in_parallel: bool,
}

/// Status counts over the plan's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    /// Tasks in the plan
    pub total: usize,
    /// Completed tasks
    pub completed: usize,
    /// Running tasks
    pub in_progress: usize,
    /// Tasks not started yet
    pub pending: usize,
    /// Failed or escalated tasks
    pub failed: usize,
    /// Completed share, rounded
    pub percentage: u32,
}

impl PlanProgress {
    /// Count task statuses.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let total = tasks.len();
        let completed = count(TaskStatus::Completed);
        let percentage = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total,
            completed,
            in_progress: count(TaskStatus::Running),
            pending: count(TaskStatus::Idle),
            failed: count(TaskStatus::Failed) + count(TaskStatus::Escalated),
            percentage,
        }
    }
}

/// A technical decision taken while the plan runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// When the decision was recorded
    pub timestamp: DateTime<Utc>,
    /// What was decided
    pub decision: String,
    /// Why
    pub reason: String,
    /// Options that were considered
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// How the decision is carried out
    #[serde(default)]
    pub implementation: Option<String>,
}

/// Start, last update and expected completion of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// When the document was generated
    pub started: DateTime<Utc>,
    /// Last status refresh or decision
    pub last_update: DateTime<Utc>,
    /// Start plus the summed task estimates
    pub expected_completion: DateTime<Utc>,
}

/// Plan overview, levels, progress, decisions and timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Work item number
    pub work_item: u64,
    /// Overview section or the work item title
    pub overview: String,
    /// Tasks grouped by level
    pub levels: Vec<PlanLevel>,
    /// Status counts
    pub progress: PlanProgress,
    /// Decision log, oldest first
    pub decisions: Vec<Decision>,
    /// Plan timeline
    pub timeline: Timeline,
}

impl PlanDocument {
    /// Build a document from a work item and its graph.
    ///
    /// Expected completion is now plus the summed task estimates.
    pub fn generate(work_item: &WorkItem, graph: &DependencyGraph) -> Self {
        let levels = graph
            .levels
            .iter()
            .enumerate()
            .map(|(level, ids)| {
                let tasks: Vec<Task> = ids.iter().filter_map(|id| graph.task(id)).cloned().collect();
                PlanLevel {
                    level,
                    can_run_in_parallel: tasks.len() > 1,
                    tasks,
                }
            })
            .collect();

        let now = Utc::now();
        let total_minutes = total_duration(&graph.nodes);

        Self {
            work_item: work_item.number,
            overview: extract_overview(work_item),
            levels,
            progress: PlanProgress::from_tasks(&graph.nodes),
            decisions: Vec::new(),
            timeline: Timeline {
                started: now,
                last_update: now,
                expected_completion: now + Duration::minutes(i64::from(total_minutes)),
            },
        }
    }

    /// Append a decision and bump the last update time.
    pub fn record_decision(
        &mut self,
        decision: impl Into<String>,
        reason: impl Into<String>,
        alternatives: Vec<String>,
        implementation: Option<String>,
    ) {
        let now = Utc::now();
        self.decisions.push(Decision {
            timestamp: now,
            decision: decision.into(),
            reason: reason.into(),
            alternatives,
            implementation,
        });
        self.timeline.last_update = now;
    }

    /// Refresh task statuses and progress from executed tasks.
    pub fn update_statuses(&mut self, tasks: &[Task]) {
        for level in &mut self.levels {
            for task in &mut level.tasks {
                if let Some(current) = tasks.iter().find(|t| t.id == task.id) {
                    task.status = current.status;
                }
            }
        }
        self.progress = PlanProgress::from_tasks(tasks);
        self.timeline.last_update = Utc::now();
    }

    /// Render the document as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# Execution Plan - Work Item #{}\n\n", self.work_item);

        md.push_str(&format!("## Overview\n{}\n\n", self.overview));

        md.push_str("## Tasks\n");
        for level in &self.levels {
            let parallel = if level.can_run_in_parallel { " (parallel)" } else { "" };
            md.push_str(&format!("### Level {}{}\n", level.level, parallel));
            for task in &level.tasks {
                let checkbox = if task.status == TaskStatus::Completed { "[x]" } else { "[ ]" };
                md.push_str(&format!("- {checkbox} Task {}: {}\n", task.id, task.title));
                md.push_str(&format!("  - Worker: {}\n", task.assigned_worker));
                md.push_str(&format!("  - Duration: {} min\n", task.estimated_duration));
                md.push_str(&format!("  - Status: {}\n", task.status));
                if !task.dependencies.is_empty() {
                    md.push_str(&format!("  - Dependencies: {}\n", task.dependencies.join(", ")));
                }
                md.push('\n');
            }
        }

        let p = &self.progress;
        md.push_str("## Progress\n");
        md.push_str(&format!("- Total: {} tasks\n", p.total));
        md.push_str(&format!("- Completed: {}/{} ({}%)\n", p.completed, p.total, p.percentage));
        md.push_str(&format!("- In Progress: {}\n", p.in_progress));
        md.push_str(&format!("- Pending: {}\n", p.pending));
        md.push_str(&format!("- Failed: {}\n\n", p.failed));

        if !self.decisions.is_empty() {
            md.push_str("## Decisions\n");
            for d in &self.decisions {
                md.push_str(&format!("### {}\n", d.timestamp.format(TIMESTAMP_FORMAT)));
                md.push_str(&format!("- **Decision**: {}\n", d.decision));
                md.push_str(&format!("- **Reason**: {}\n", d.reason));
                if !d.alternatives.is_empty() {
                    md.push_str(&format!("- **Alternatives**: {}\n", d.alternatives.join(", ")));
                }
                if let Some(implementation) = &d.implementation {
                    md.push_str(&format!("- **Implementation**: {implementation}\n"));
                }
                md.push('\n');
            }
        }

        let t = &self.timeline;
        md.push_str("## Timeline\n");
        md.push_str(&format!("- Started: {}\n", t.started.format(TIMESTAMP_FORMAT)));
        md.push_str(&format!("- Last Update: {}\n", t.last_update.format(TIMESTAMP_FORMAT)));
        md.push_str(&format!(
            "- Expected Completion: {}\n",
            t.expected_completion.format(TIMESTAMP_FORMAT)
        ));

        md
    }
}

/// First one or two lines under `## Overview`, else the work item title.
fn extract_overview(work_item: &WorkItem) -> String {
    OVERVIEW_RE
        .captures(&work_item.body)
        .and_then(|c| c.get(1))
        .map_or_else(|| work_item.title.clone(), |m| m.as_str().trim().to_string())
}
