//! Dependency graph construction, cycle detection and topological leveling.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CriticalPath, DependencyGraph, GraphEdge, SchedulerConfig, Task, total_duration,
};

/// Chains deeper than this many levels produce a recommendation.
const DEEP_CHAIN_LEVELS: usize = 5;

/// Share of total estimated work above which a single task is flagged.
const DOMINANT_TASK_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// Index-based view of a graph, in decomposition order.
struct Adjacency<'a> {
    index: HashMap<&'a str, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl<'a> Adjacency<'a> {
    fn new(graph: &'a DependencyGraph) -> Self {
        let index: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let mut successors = vec![Vec::new(); graph.nodes.len()];
        let mut predecessors = vec![Vec::new(); graph.nodes.len()];

        for edge in &graph.edges {
            if let (Some(&from), Some(&to)) =
                (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }

        Self {
            index,
            successors,
            predecessors,
        }
    }
}

// Three-color DFS; `path` holds the current in-progress chain.
fn detect_cycle_util(
    node: usize,
    successors: &[Vec<usize>],
    colors: &mut [Color],
    path: &mut Vec<usize>,
) -> bool {
    colors[node] = Color::InProgress;
    path.push(node);

    for &next in &successors[node] {
        match colors[next] {
            Color::Unvisited => {
                if detect_cycle_util(next, successors, colors, path) {
                    return true;
                }
            }
            Color::InProgress => {
                if let Some(cycle_start) = path.iter().position(|&n| n == next) {
                    path.drain(0..cycle_start);
                }
                return true;
            }
            Color::Done => {}
        }
    }

    colors[node] = Color::Done;
    path.pop();
    false
}

/// Builds dependency graphs from task sets.
#[derive(Debug, Clone)]
pub struct DependencyGraphBuilder {
    max_concurrency: usize,
    large_plan_threshold: usize,
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl DependencyGraphBuilder {
    /// Builder with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder using the scheduler's concurrency cap for width advice.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            large_plan_threshold: config.large_plan_threshold,
        }
    }

    /// Build the graph for a task set and compute its levels.
    ///
    /// Each declared dependency present in the set becomes an edge
    /// `dependency -> dependent`. Dependencies on ids outside the set are
    /// treated as satisfied externally and produce no edge.
    #[instrument(skip(self, tasks), fields(task_count = tasks.len()))]
    pub fn build_graph(&self, tasks: &[Task]) -> DomainResult<DependencyGraph> {
        let mut ids = HashSet::with_capacity(tasks.len());
        for task in tasks {
            if !ids.insert(task.id.as_str()) {
                return Err(DomainError::ValidationFailed(format!(
                    "Duplicate task id in plan: {}",
                    task.id
                )));
            }
        }

        let mut edges = Vec::new();
        for task in tasks {
            let mut seen = HashSet::new();
            for dep in &task.dependencies {
                if !seen.insert(dep.as_str()) {
                    continue;
                }
                if ids.contains(dep.as_str()) {
                    edges.push(GraphEdge::new(dep.clone(), task.id.clone()));
                } else {
                    debug!(task_id = %task.id, dependency = %dep, "external dependency treated as satisfied");
                }
            }
        }

        let mut graph = DependencyGraph {
            nodes: tasks.to_vec(),
            edges,
            levels: Vec::new(),
            unresolved: Vec::new(),
        };

        let (levels, unresolved) = self.compute_levels(&graph);
        if !unresolved.is_empty() {
            warn!(unresolved = ?unresolved, "tasks could not be leveled; appended as unresolved level");
        }
        graph.levels = levels;
        graph.unresolved = unresolved;

        Ok(graph)
    }

    /// Detect a dependency cycle.
    ///
    /// Returns the ids on the first cycle found, walking tasks in
    /// decomposition order, or `None` when the graph is acyclic.
    pub fn detect_cycles(&self, graph: &DependencyGraph) -> Option<Vec<String>> {
        let adjacency = Adjacency::new(graph);
        let mut colors = vec![Color::Unvisited; graph.nodes.len()];
        let mut path = Vec::new();

        for node in 0..graph.nodes.len() {
            if colors[node] == Color::Unvisited
                && detect_cycle_util(node, &adjacency.successors, &mut colors, &mut path)
            {
                return Some(path.iter().map(|&i| graph.nodes[i].id.clone()).collect());
            }
        }

        None
    }

    /// Compute topological levels with Kahn's algorithm.
    ///
    /// Level 0 holds tasks without in-plan dependencies; level k holds tasks
    /// whose dependencies all sit in levels below k. Ties keep decomposition
    /// order. Tasks that cannot be leveled (cycle members and everything
    /// downstream of them) form one trailing level, returned separately as
    /// the second element too.
    pub fn compute_levels(&self, graph: &DependencyGraph) -> (Vec<Vec<String>>, Vec<String>) {
        let adjacency = Adjacency::new(graph);
        let mut in_degree: Vec<usize> = adjacency.predecessors.iter().map(Vec::len).collect();
        let mut placed = vec![false; graph.nodes.len()];
        let mut levels: Vec<Vec<String>> = Vec::new();

        let mut current: Vec<usize> = (0..graph.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                placed[node] = true;
                for &succ in &adjacency.successors[node] {
                    in_degree[succ] -= 1;
                    if in_degree[succ] == 0 {
                        next.push(succ);
                    }
                }
            }
            levels.push(current.iter().map(|&i| graph.nodes[i].id.clone()).collect());
            next.sort_unstable();
            current = next;
        }

        let unresolved: Vec<String> = (0..graph.nodes.len())
            .filter(|&i| !placed[i])
            .map(|i| graph.nodes[i].id.clone())
            .collect();
        if !unresolved.is_empty() {
            levels.push(unresolved.clone());
        }

        (levels, unresolved)
    }

    /// Longest duration-weighted path through the leveled tasks.
    ///
    /// A lower bound on total run time regardless of available concurrency.
    pub fn calculate_critical_path(&self, graph: &DependencyGraph) -> CriticalPath {
        let adjacency = Adjacency::new(graph);
        let unresolved: HashSet<&str> = graph.unresolved.iter().map(String::as_str).collect();
        let mut distance: Vec<Option<u32>> = vec![None; graph.nodes.len()];
        let mut previous: Vec<Option<usize>> = vec![None; graph.nodes.len()];

        for level in &graph.levels {
            for id in level {
                if unresolved.contains(id.as_str()) {
                    continue;
                }
                let Some(&node) = adjacency.index.get(id.as_str()) else {
                    continue;
                };
                let mut best: Option<(usize, u32)> = None;
                for &pred in &adjacency.predecessors[node] {
                    if let Some(d) = distance[pred] {
                        if best.is_none_or(|(_, b)| d > b) {
                            best = Some((pred, d));
                        }
                    }
                }
                let base = best.map_or(0, |(_, d)| d);
                distance[node] = Some(base.saturating_add(graph.nodes[node].estimated_duration));
                previous[node] = best.map(|(p, _)| p);
            }
        }

        let mut end: Option<(usize, u32)> = None;
        for (node, d) in distance.iter().enumerate() {
            if let Some(d) = *d {
                if end.is_none_or(|(_, b)| d > b) {
                    end = Some((node, d));
                }
            }
        }

        let Some((end_node, duration_minutes)) = end else {
            return CriticalPath::default();
        };

        let mut task_ids = Vec::new();
        let mut cursor = Some(end_node);
        while let Some(node) = cursor {
            task_ids.push(graph.nodes[node].id.clone());
            cursor = previous[node];
        }
        task_ids.reverse();

        CriticalPath {
            task_ids,
            duration_minutes,
        }
    }

    /// Advisory notes on the shape of a plan. Purely informational.
    pub fn generate_recommendations(&self, graph: &DependencyGraph) -> Vec<String> {
        let mut recommendations = Vec::new();

        if graph.nodes.len() > self.large_plan_threshold {
            recommendations.push(format!(
                "Large plan: {} tasks exceed the threshold of {}; consider splitting the work item",
                graph.nodes.len(),
                self.large_plan_threshold
            ));
        }

        if let Some(cycle) = self.detect_cycles(graph) {
            recommendations.push(format!(
                "Circular dependency among [{}]; break the cycle before relying on this plan",
                cycle.join(", ")
            ));
        }

        let leveled = graph.levels.len() - usize::from(graph.has_unresolved());
        if leveled > DEEP_CHAIN_LEVELS {
            recommendations.push(format!(
                "Deep dependency chain: {leveled} levels; look for tasks that can run in parallel"
            ));
        }

        for (idx, level) in graph.levels.iter().enumerate() {
            if level.len() > self.max_concurrency {
                recommendations.push(format!(
                    "Level {} holds {} tasks, above the concurrency cap of {}; it will run in batches",
                    idx,
                    level.len(),
                    self.max_concurrency
                ));
            }
        }

        let total = total_duration(&graph.nodes);
        if graph.nodes.len() > 1 && total > 0 {
            for task in &graph.nodes {
                let share = f64::from(task.estimated_duration) / f64::from(total);
                if share > DOMINANT_TASK_SHARE {
                    recommendations.push(format!(
                        "Task {} accounts for {:.0}% of estimated work; consider breaking it down",
                        task.id,
                        share * 100.0
                    ));
                }
            }
        }

        recommendations
    }
}
