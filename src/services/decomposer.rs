//! Work item decomposition.
//!
//! Turns the markdown body of a work item into an ordered task list. Lines in
//! checkbox, numbered or level-2 heading form each become one task (except an
//! `## Overview` heading); a body with none of these yields a single task
//! built from the work item title.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ImpactLevel, Severity, Task, TaskDecomposition, TaskType, WorkItem, total_duration,
};
use crate::services::dependency_graph::DependencyGraphBuilder;

static CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^-\s*\[[ x]\]\s+(.+)$").expect("valid regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+(.+)$").expect("valid regex"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s+(.+)$").expect("valid regex"));
static ISSUE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("valid regex"));

/// Extracts tasks from work items and builds their dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Decomposer {
    graph_builder: DependencyGraphBuilder,
}

impl Decomposer {
    /// Decomposer that levels tasks with `graph_builder`.
    pub fn new(graph_builder: DependencyGraphBuilder) -> Self {
        Self { graph_builder }
    }

    /// Decompose a work item into tasks, graph and recommendations.
    ///
    /// Cycles are reported through `has_cycles`; they never fail decomposition.
    #[instrument(skip(self, work_item), fields(work_item = work_item.number))]
    pub fn decompose(&self, work_item: &WorkItem) -> DomainResult<TaskDecomposition> {
        let tasks = self.extract_tasks(work_item);
        let graph = self.graph_builder.build_graph(&tasks)?;
        let has_cycles = self.graph_builder.detect_cycles(&graph).is_some();
        let recommendations = self.graph_builder.generate_recommendations(&graph);
        let estimated_total_duration = total_duration(&tasks);

        info!(
            task_count = tasks.len(),
            levels = graph.levels.len(),
            has_cycles,
            "work item decomposed"
        );

        Ok(TaskDecomposition {
            work_item: work_item.clone(),
            tasks,
            graph,
            estimated_total_duration,
            has_cycles,
            recommendations,
        })
    }

    /// Extract tasks from the work item body, falling back to its title.
    pub fn extract_tasks(&self, work_item: &WorkItem) -> Vec<Task> {
        let mut tasks = Vec::new();

        for line in work_item.body.lines() {
            let captured = CHECKBOX_RE
                .captures(line)
                .or_else(|| NUMBERED_RE.captures(line))
                .or_else(|| HEADING_RE.captures(line));

            if let Some(title) = captured.and_then(|c| c.get(1)) {
                // The overview section describes the work item, not a task.
                if title.as_str().trim().eq_ignore_ascii_case("overview") {
                    continue;
                }
                tasks.push(build_task(work_item, title.as_str(), tasks.len()));
            }
        }

        if tasks.is_empty() {
            tasks.push(build_task(work_item, &work_item.title, 0));
        }

        tasks
    }
}

fn build_task(work_item: &WorkItem, title: &str, index: usize) -> Task {
    let title = title.trim();
    let dependencies = ISSUE_REF_RE
        .captures_iter(title)
        .filter_map(|c| c.get(1))
        .map(|n| format!("issue-{}", n.as_str()));

    let labels: Vec<String> = work_item.labels.iter().map(|l| l.to_lowercase()).collect();
    let lowered = title.to_lowercase();
    let task_type = classify_type(&labels, &lowered);

    let mut task = Task::new(format!("task-{}-{}", work_item.number, index), title)
        .with_type(task_type)
        .with_priority(u32::try_from(index).unwrap_or(u32::MAX))
        .with_dependencies(dependencies)
        .with_duration(estimate_duration(task_type, title));
    task.description = format!("Task from work item #{}", work_item.number);
    task.severity = classify_severity(&labels, &lowered);
    task.impact = classify_impact(&labels, &lowered);
    task.metadata.insert("work_item".to_string(), json!(work_item.number));
    if !work_item.url.is_empty() {
        task.metadata.insert("work_item_url".to_string(), json!(work_item.url));
    }
    task
}

fn any_contains(haystacks: &[String], needles: &[&str]) -> bool {
    haystacks
        .iter()
        .any(|h| needles.iter().any(|n| h.contains(n)))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

// Labels win over title keywords.
fn classify_type(labels: &[String], title: &str) -> TaskType {
    let rules: [(TaskType, &[&str]); 6] = [
        (TaskType::Deployment, &["deploy", "release"]),
        (TaskType::Bug, &["bug", "fix", "crash", "error"]),
        (TaskType::Refactor, &["refactor", "cleanup", "clean up", "restructure"]),
        (TaskType::Docs, &["doc", "readme"]),
        (TaskType::Test, &["test", "coverage"]),
        (TaskType::Feature, &["feature", "enhancement"]),
    ];

    rules
        .iter()
        .find(|(_, keys)| any_contains(labels, keys))
        .or_else(|| rules.iter().find(|(_, keys)| contains_any(title, keys)))
        .map_or(TaskType::Feature, |(ty, _)| *ty)
}

fn classify_severity(labels: &[String], title: &str) -> Severity {
    let rules: [(Severity, &[&str]); 4] = [
        (Severity::Critical, &["sev.1", "critical", "outage"]),
        (Severity::High, &["sev.2", "security", "vulnerability", "crash"]),
        (Severity::Low, &["sev.4", "minor"]),
        (Severity::Trivial, &["sev.5", "trivial", "typo"]),
    ];

    rules
        .iter()
        .find(|(_, keys)| any_contains(labels, keys))
        .or_else(|| rules.iter().find(|(_, keys)| contains_any(title, keys)))
        .map_or(Severity::Medium, |(sev, _)| *sev)
}

fn classify_impact(labels: &[String], title: &str) -> ImpactLevel {
    let rules: [(ImpactLevel, &[&str]); 3] = [
        (ImpactLevel::Critical, &["impact:critical", "data loss"]),
        (ImpactLevel::High, &["impact:high", "production", "breaking"]),
        (ImpactLevel::Low, &["impact:low", "typo", "cosmetic"]),
    ];

    rules
        .iter()
        .find(|(_, keys)| any_contains(labels, keys))
        .or_else(|| rules.iter().find(|(_, keys)| contains_any(title, keys)))
        .map_or(ImpactLevel::Medium, |(impact, _)| *impact)
}

/// Minutes, from a per-type base scaled up for long titles.
fn estimate_duration(task_type: TaskType, title: &str) -> u32 {
    let base = match task_type {
        TaskType::Feature => 60,
        TaskType::Refactor => 45,
        TaskType::Bug | TaskType::Test => 30,
        TaskType::Docs => 20,
        TaskType::Deployment => 15,
    };

    match title.chars().count() {
        n if n > 80 => base * 2,
        n if n > 40 => base * 3 / 2,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::WorkerType;

    #[test]
    fn test_extracts_all_task_forms() {
        let item = WorkItem::new(
            42,
            "Parser overhaul",
            "Intro text\n- [ ] Tokenize input\n- [x] Fix crash on empty file\n1. Write docs for grammar\n2) Deploy to staging\n## Add benchmarks\nplain line",
        );

        let tasks = Decomposer::default().extract_tasks(&item);

        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Tokenize input",
                "Fix crash on empty file",
                "Write docs for grammar",
                "Deploy to staging",
                "Add benchmarks",
            ]
        );
        assert_eq!(tasks[0].id, "task-42-0");
        assert_eq!(tasks[4].id, "task-42-4");
        assert_eq!(tasks[4].priority, 4);
    }

    #[test]
    fn test_overview_heading_is_not_a_task() {
        let item = WorkItem::new(5, "t", "## Overview\nContext here\n## Build index");

        let tasks = Decomposer::default().extract_tasks(&item);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Build index");
    }

    #[test]
    fn test_falls_back_to_title() {
        let item = WorkItem::new(7, "Improve error messages", "No structure here.");

        let tasks = Decomposer::default().extract_tasks(&item);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "task-7-0");
        assert_eq!(tasks[0].title, "Improve error messages");
    }

    #[test]
    fn test_issue_references_become_dependencies() {
        let item = WorkItem::new(1, "t", "- [ ] Wire up API (depends: #270, #271)");

        let tasks = Decomposer::default().extract_tasks(&item);

        assert_eq!(tasks[0].dependencies, vec!["issue-270", "issue-271"]);
    }

    #[test]
    fn test_classification_and_worker_assignment() {
        let item = WorkItem::new(3, "t", "- [ ] Deploy service\n- [ ] Fix crash in parser");

        let tasks = Decomposer::default().extract_tasks(&item);

        assert_eq!(tasks[0].task_type, TaskType::Deployment);
        assert_eq!(tasks[0].assigned_worker, WorkerType::Deployment);
        assert_eq!(tasks[1].task_type, TaskType::Bug);
        assert_eq!(tasks[1].assigned_worker, WorkerType::CodeGeneration);
        assert_eq!(tasks[1].severity, Severity::High);
    }

    #[test]
    fn test_labels_take_precedence() {
        let item = WorkItem::new(3, "t", "- [ ] Add login page").with_labels(["Type:Bug", "Sev.1-Critical"]);

        let tasks = Decomposer::default().extract_tasks(&item);

        assert_eq!(tasks[0].task_type, TaskType::Bug);
        assert_eq!(tasks[0].severity, Severity::Critical);
    }

    #[test]
    fn test_duration_scales_with_title_length() {
        assert_eq!(estimate_duration(TaskType::Feature, "short"), 60);
        assert_eq!(estimate_duration(TaskType::Feature, &"x".repeat(50)), 90);
        assert_eq!(estimate_duration(TaskType::Feature, &"x".repeat(100)), 120);
    }

    #[test]
    fn test_decompose_sums_durations_and_levels() {
        let item = WorkItem::new(9, "t", "- [ ] Write docs\n- [ ] Add tests");

        let decomposition = Decomposer::default().decompose(&item).unwrap();

        assert_eq!(decomposition.tasks.len(), 2);
        assert_eq!(decomposition.estimated_total_duration, 50);
        assert!(!decomposition.has_cycles);
        assert_eq!(decomposition.graph.levels.len(), 1);
    }
}
