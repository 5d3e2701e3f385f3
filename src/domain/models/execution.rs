//! Execution plan and report models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::escalation::Escalation;
use super::graph::DependencyGraph;
use super::task::{Task, TaskStatus, WorkerType};

/// Status reported by a specialist worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Task done
    Success,
    /// Task could not be done
    Failed,
    /// Needs a human decision
    Escalated,
}

/// Quality measurements a worker may attach to its outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    /// Aggregate quality score (0-100)
    pub quality_score: Option<f64>,
    /// Number of critical-severity issues found
    #[serde(default)]
    pub critical_issues: u32,
    /// Whether any critical issue is a security issue
    #[serde(default)]
    pub critical_security_issues: u32,
    /// Lines touched by the change
    pub lines_changed: Option<u32>,
    /// Tests the worker wrote
    pub tests_added: Option<u32>,
    /// Coverage after the change
    pub coverage_percent: Option<f64>,
}

/// Uniform result of `SpecialistWorker::execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    /// How the task ended
    pub status: OutcomeStatus,
    /// Worker-specific payload
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Failure message for `Failed` outcomes
    #[serde(default)]
    pub error: Option<String>,
    /// Quality findings, checked against the escalation rules
    #[serde(default)]
    pub metrics: Option<WorkerMetrics>,
    /// Escalation raised by the worker itself
    #[serde(default)]
    pub escalation: Option<Escalation>,
}

impl WorkerOutcome {
    /// Successful outcome carrying `data`.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: OutcomeStatus::Success,
            data: Some(data),
            error: None,
            metrics: None,
            escalation: None,
        }
    }

    /// Failed outcome with an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            data: None,
            error: Some(error.into()),
            metrics: None,
            escalation: None,
        }
    }

    /// Outcome handing the task to a human.
    pub fn escalated(escalation: Escalation) -> Self {
        Self {
            status: OutcomeStatus::Escalated,
            data: None,
            error: None,
            metrics: None,
            escalation: Some(escalation),
        }
    }

    /// Attach quality metrics.
    pub fn with_metrics(mut self, metrics: WorkerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The task status this outcome settles into.
    pub fn task_status(&self) -> TaskStatus {
        match self.status {
            OutcomeStatus::Success => TaskStatus::Completed,
            OutcomeStatus::Failed => TaskStatus::Failed,
            OutcomeStatus::Escalated => TaskStatus::Escalated,
        }
    }
}

/// A plan ready for level-by-level execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Identifies this run in logs and stored reports
    pub session_id: Uuid,
    /// min(task count, configured maximum)
    pub concurrency_limit: usize,
    /// Tasks in decomposition order; statuses change as the plan runs
    pub tasks: Vec<Task>,
    /// Leveled dependency graph
    pub graph: DependencyGraph,
    /// Sum of task estimates in minutes
    pub estimated_duration: u32,
    /// When the plan was created
    pub start_time: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn set_status(&mut self, id: &str, status: TaskStatus) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
        }
    }
}

/// Result of a single task execution. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task this result belongs to
    pub task_id: String,
    /// Settled status
    pub status: TaskStatus,
    /// Worker kind that ran, or would have run, the task
    pub worker_type: WorkerType,
    /// Wall time spent in the worker
    pub duration_ms: u64,
    /// Raw worker outcome, absent when the worker errored or never ran
    #[serde(default)]
    pub outcome: Option<WorkerOutcome>,
    /// Why the task failed
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskResult {
    /// Failed result with no worker outcome.
    pub fn failed(
        task_id: impl Into<String>,
        worker_type: WorkerType,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            worker_type,
            duration_ms,
            outcome: None,
            error: Some(error.into()),
        }
    }
}

/// Per-status counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Tasks in the plan
    pub total: usize,
    /// Tasks that completed
    pub completed: usize,
    /// Tasks that failed, including skipped ones
    pub failed: usize,
    /// Tasks handed to a human
    pub escalated: usize,
    /// completed / total * 100, 0 when there are no tasks
    pub success_rate: f64,
}

impl ExecutionSummary {
    /// Count `results` against a plan of `total` tasks.
    pub fn from_results(total: usize, results: &[TaskResult]) -> Self {
        let count = |status: TaskStatus| results.iter().filter(|r| r.status == status).count();
        let completed = count(TaskStatus::Completed);
        let success_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            completed,
            failed: count(TaskStatus::Failed),
            escalated: count(TaskStatus::Escalated),
            success_rate,
        }
    }
}

/// Final report of a scheduler run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Session of the plan that ran
    pub session_id: Uuid,
    /// When execution started
    pub start_time: DateTime<Utc>,
    /// When the last level finished
    pub end_time: DateTime<Utc>,
    /// Wall time of the whole run
    pub total_duration_ms: u64,
    /// Per-status counts
    pub summary: ExecutionSummary,
    /// One result per task, in level order
    pub tasks: Vec<TaskResult>,
    /// Escalations raised by workers or by quality findings
    pub escalations: Vec<Escalation>,
}

/// Running progress emitted after each level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Tasks in the plan
    pub total: usize,
    /// Tasks completed so far
    pub completed: usize,
    /// Tasks failed so far
    pub failed: usize,
    /// Tasks escalated so far
    pub escalated: usize,
    /// Tasks without a result yet
    pub waiting: usize,
    /// Completed share, rounded
    pub percentage: u32,
}

impl ProgressSnapshot {
    /// Snapshot after `results` have settled.
    pub fn from_results(total: usize, results: &[TaskResult]) -> Self {
        let summary = ExecutionSummary::from_results(total, results);
        let percentage = if total == 0 {
            0
        } else {
            ((summary.completed as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total,
            completed: summary.completed,
            failed: summary.failed,
            escalated: summary.escalated,
            waiting: total.saturating_sub(results.len()),
            percentage,
        }
    }
}
