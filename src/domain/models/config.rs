//! Configuration model shared by the loader and the services.

use serde::{Deserialize, Serialize};

/// Main configuration structure for Shepherd
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Feedback loop configuration
    #[serde(default)]
    pub feedback_loop: FeedbackLoopConfig,

    /// Report persistence configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What happens to tasks whose in-plan dependency did not complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyFailurePolicy {
    /// Dependents still launch when their level is reached
    #[default]
    BestEffort,
    /// Dependents are recorded as failed without being dispatched
    PropagateSkip,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Upper bound on concurrently running tasks within a level
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Handling of dependents of failed tasks
    #[serde(default)]
    pub dependency_failure_policy: DependencyFailurePolicy,

    /// Task count above which decomposition recommends splitting the work item
    #[serde(default = "default_large_plan_threshold")]
    pub large_plan_threshold: usize,
}

const fn default_max_concurrency() -> usize {
    5
}

const fn default_large_plan_threshold() -> usize {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            dependency_failure_policy: DependencyFailurePolicy::default(),
            large_plan_threshold: default_large_plan_threshold(),
        }
    }
}

/// Feedback loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedbackLoopConfig {
    /// Iteration cap per loop
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Score variance below which a loop may be considered converging
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Iterations required before convergence or divergence is judged
    #[serde(default = "default_min_iterations_before_convergence")]
    pub min_iterations_before_convergence: u32,

    /// Whether stagnating or diverging loops relax their goal
    #[serde(default = "default_true")]
    pub auto_refinement_enabled: bool,

    /// Whether loop and iteration snapshots go to the report store
    #[serde(default = "default_true")]
    pub auto_save: bool,
}

const fn default_max_iterations() -> u32 {
    10
}

const fn default_convergence_threshold() -> f64 {
    5.0
}

const fn default_min_iterations_before_convergence() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

impl Default for FeedbackLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
            min_iterations_before_convergence: default_min_iterations_before_convergence(),
            auto_refinement_enabled: true,
            auto_save: true,
        }
    }
}

/// Report persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersistenceConfig {
    /// Directory receiving execution reports and loop snapshots
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

fn default_reports_dir() -> String {
    ".shepherd/reports".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduler.max_concurrency, 5);
        assert_eq!(
            config.scheduler.dependency_failure_policy,
            DependencyFailurePolicy::BestEffort
        );
        assert_eq!(config.feedback_loop.max_iterations, 10);
        assert_eq!(config.feedback_loop.min_iterations_before_convergence, 3);
        assert!(config.feedback_loop.auto_refinement_enabled);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r"
scheduler:
  dependency_failure_policy: propagate_skip
feedback_loop:
  max_iterations: 4
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(
            config.scheduler.dependency_failure_policy,
            DependencyFailurePolicy::PropagateSkip
        );
        assert_eq!(config.scheduler.max_concurrency, 5);
        assert_eq!(config.feedback_loop.max_iterations, 4);
        assert!((config.feedback_loop.convergence_threshold - 5.0).abs() < f64::EPSILON);
    }
}
