//! Task domain model.
//!
//! Tasks are the units of work produced by decomposing a work item.
//! They form a dependency graph and are executed by specialist workers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Execution status of a task.
///
/// `status` is the only field of a [`Task`] that changes while a plan runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet dispatched
    #[default]
    Idle,
    /// Dispatched to a worker
    Running,
    /// Worker reported success
    Completed,
    /// Worker reported failure, errored, or was never dispatched
    Failed,
    /// Worker handed the task to a human
    Escalated,
}

impl TaskStatus {
    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Escalated)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of work a task represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// New functionality
    #[default]
    Feature,
    /// Defect fix
    Bug,
    /// Restructuring without behavior change
    Refactor,
    /// Documentation
    Docs,
    /// Test coverage
    Test,
    /// Release or rollout
    Deployment,
}

impl TaskType {
    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Refactor => "refactor",
            Self::Docs => "docs",
            Self::Test => "test",
            Self::Deployment => "deployment",
        }
    }

    /// The specialist worker kind that handles this task type.
    pub fn default_worker(&self) -> WorkerType {
        match self {
            Self::Deployment => WorkerType::Deployment,
            Self::Feature | Self::Bug | Self::Refactor | Self::Docs | Self::Test => {
                WorkerType::CodeGeneration
            }
        }
    }
}

/// Severity classification, `Sev.1-Critical` being the most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Outage, data loss or critical security issue
    #[serde(rename = "Sev.1-Critical")]
    Critical,
    /// Major breakage
    #[serde(rename = "Sev.2-High")]
    High,
    /// Default for unclassified work
    #[serde(rename = "Sev.3-Medium")]
    #[default]
    Medium,
    /// Minor issue
    #[serde(rename = "Sev.4-Low")]
    Low,
    /// Cosmetic
    #[serde(rename = "Sev.5-Trivial")]
    Trivial,
}

impl Severity {
    /// `Sev.N-Name` label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Sev.1-Critical",
            Self::High => "Sev.2-High",
            Self::Medium => "Sev.3-Medium",
            Self::Low => "Sev.4-Low",
            Self::Trivial => "Sev.5-Trivial",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business impact of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    /// Risks data or the whole service
    Critical,
    /// Visible in production
    High,
    /// Default for unclassified work
    #[default]
    Medium,
    /// Cosmetic or internal
    Low,
}

/// Capability set of specialist workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    /// Writes and changes code; fallback for unregistered types
    #[default]
    CodeGeneration,
    /// Reviews changes and reports quality findings
    Review,
    /// Ships releases
    Deployment,
    /// Files and updates issues
    IssueManagement,
    /// Opens and maintains pull requests
    PullRequestManagement,
}

impl WorkerType {
    /// All worker types, in declaration order.
    pub const ALL: [WorkerType; 5] = [
        Self::CodeGeneration,
        Self::Review,
        Self::Deployment,
        Self::IssueManagement,
        Self::PullRequestManagement,
    ];

    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeGeneration => "code_generation",
            Self::Review => "review",
            Self::Deployment => "deployment",
            Self::IssueManagement => "issue_management",
            Self::PullRequestManagement => "pull_request_management",
        }
    }

    /// Parse a worker type, accepting dashes and a few short aliases.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "code_generation" | "codegen" => Some(Self::CodeGeneration),
            "review" => Some(Self::Review),
            "deployment" => Some(Self::Deployment),
            "issue_management" | "issue" => Some(Self::IssueManagement),
            "pull_request_management" | "pr" => Some(Self::PullRequestManagement),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work in an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a plan
    pub id: String,
    /// Short human readable title
    pub title: String,
    /// Longer description, empty when the source had none
    #[serde(default)]
    pub description: String,
    /// Category, drives the default worker and duration estimate
    pub task_type: TaskType,
    /// Ordinal priority; decomposition assigns the extraction index
    pub priority: u32,
    /// Severity classification
    pub severity: Severity,
    /// Business impact
    pub impact: ImpactLevel,
    /// Worker kind the scheduler dispatches this task to
    pub assigned_worker: WorkerType,
    /// Ids of tasks that must complete first. Ids outside the plan are
    /// treated as satisfied externally.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Estimated duration in minutes
    #[serde(default)]
    pub estimated_duration: u32,
    /// Current execution status
    #[serde(default)]
    pub status: TaskStatus,
    /// Free-form data passed through to the worker
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Create an idle feature task handled by the code generation worker.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            task_type: TaskType::Feature,
            priority: 0,
            severity: Severity::default(),
            impact: ImpactLevel::default(),
            assigned_worker: WorkerType::CodeGeneration,
            dependencies: Vec::new(),
            estimated_duration: 0,
            status: TaskStatus::Idle,
            metadata: HashMap::new(),
        }
    }

    /// Set the task type and route it to that type's default worker.
    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self.assigned_worker = task_type.default_worker();
        self
    }

    /// Override the assigned worker.
    pub fn with_worker(mut self, worker: WorkerType) -> Self {
        self.assigned_worker = worker;
        self
    }

    /// Add a dependency id.
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Add several dependency ids.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Set the estimated duration in minutes.
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = minutes;
        self
    }

    /// Set the ordinal priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Summed estimated duration of `tasks` in minutes, saturating at `u32::MAX`.
pub fn total_duration<'a, I>(tasks: I) -> u32
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .map(|t| t.estimated_duration)
        .fold(0u32, u32::saturating_add)
}

/// A free-form work item (an issue) that decomposes into tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Issue number; task ids are derived from it
    pub number: u64,
    /// Issue title; the fallback task when the body has no tasks
    pub title: String,
    /// Markdown body tasks are extracted from
    #[serde(default)]
    pub body: String,
    /// Labels, checked before title keywords when classifying tasks
    #[serde(default)]
    pub labels: Vec<String>,
    /// Link back to the issue, if any
    #[serde(default)]
    pub url: String,
}

impl WorkItem {
    /// Create a work item with no labels or url.
    pub fn new(number: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: body.into(),
            labels: Vec::new(),
            url: String::new(),
        }
    }

    /// Replace the labels.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        let task = Task::new("t1", "Write parser");
        assert_eq!(task.status, TaskStatus::Idle);
        assert_eq!(task.assigned_worker, WorkerType::CodeGeneration);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_deployment_routes_to_deployment_worker() {
        let task = Task::new("t1", "Ship it").with_type(TaskType::Deployment);
        assert_eq!(task.assigned_worker, WorkerType::Deployment);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Idle.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Escalated.is_terminal());
    }

    #[test]
    fn test_severity_serializes_with_label() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"Sev.2-High\"");
    }

    #[test]
    fn test_total_duration_saturates() {
        let tasks = vec![
            Task::new("a", "a").with_duration(u32::MAX - 5),
            Task::new("b", "b").with_duration(10),
            Task::new("c", "c").with_duration(1),
        ];
        assert_eq!(total_duration(&tasks), u32::MAX);
        assert_eq!(total_duration(&tasks[1..]), 11);
        assert_eq!(total_duration(&tasks[..0]), 0);
    }

    #[test]
    fn test_worker_type_from_str() {
        assert_eq!(WorkerType::from_str("pull-request-management"), Some(WorkerType::PullRequestManagement));
        assert_eq!(WorkerType::from_str("codegen"), Some(WorkerType::CodeGeneration));
        assert_eq!(WorkerType::from_str("unknown"), None);
    }
}
