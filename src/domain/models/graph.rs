//! Dependency graph domain models
//!
//! A task set with its dependency edges and the topological levels used for
//! barrier-synchronized execution.

use serde::{Deserialize, Serialize};

use super::task::Task;

/// An edge in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// The dependency (must finish first)
    pub from: String,
    /// The dependent task
    pub to: String,
}

impl GraphEdge {
    /// Edge from a dependency to its dependent.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Directed graph of tasks with topologically sorted levels.
///
/// For every edge `A -> B`, `A` sits in an earlier level than `B` unless both
/// sit in the trailing unresolved level produced by a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Tasks in decomposition order
    pub nodes: Vec<Task>,
    /// One edge per in-plan dependency, deduplicated
    pub edges: Vec<GraphEdge>,
    /// Task ids grouped by level, level 0 first
    pub levels: Vec<Vec<String>>,
    /// Ids that could not be leveled; also present as the last entry of `levels`
    #[serde(default)]
    pub unresolved: Vec<String>,
}

impl DependencyGraph {
    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.nodes.iter().find(|t| t.id == id)
    }

    /// Position of a task in decomposition order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|t| t.id == id)
    }

    /// Level index of a task, if leveled.
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.levels
            .iter()
            .position(|level| level.iter().any(|t| t == id))
    }

    /// In-plan dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from.as_str())
            .collect()
    }

    /// Tasks that directly depend on the given task.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Whether a cycle left tasks unleveled.
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Longest duration-weighted chain through the leveled part of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Task ids from source to sink
    pub task_ids: Vec<String>,
    /// Total estimated minutes along the path
    pub duration_minutes: u32,
}

/// Result of decomposing a work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDecomposition {
    /// Work item that was decomposed
    pub work_item: super::task::WorkItem,
    /// Extracted tasks in decomposition order
    pub tasks: Vec<Task>,
    /// Leveled dependency graph of `tasks`
    pub graph: DependencyGraph,
    /// Sum of task estimates in minutes
    pub estimated_total_duration: u32,
    /// Whether the graph contains a cycle
    pub has_cycles: bool,
    /// Advisory notes on the plan shape
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> DependencyGraph {
        DependencyGraph {
            nodes: vec![Task::new("a", "A"), Task::new("b", "B").with_dependency("a")],
            edges: vec![GraphEdge::new("a", "b")],
            levels: vec![vec!["a".into()], vec!["b".into()]],
            unresolved: vec![],
        }
    }

    #[test]
    fn test_level_lookup() {
        let graph = sample_graph();
        assert_eq!(graph.level_of("a"), Some(0));
        assert_eq!(graph.level_of("b"), Some(1));
        assert_eq!(graph.level_of("missing"), None);
    }

    #[test]
    fn test_neighbors() {
        let graph = sample_graph();
        assert_eq!(graph.dependencies_of("b"), vec!["a"]);
        assert_eq!(graph.dependents_of("a"), vec!["b"]);
        assert!(graph.dependents_of("b").is_empty());
    }
}
