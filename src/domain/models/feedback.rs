//! Feedback loop domain models.
//!
//! A feedback loop drives a goal through repeated iterations. Each iteration
//! validates measured metrics against the goal, producing a consumption report
//! whose `overall_score` feeds the convergence statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::goal::{Goal, GoalRefinement};

/// Lifecycle status of a feedback loop.
///
/// Every status other than `Running` is terminal; loops never resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// Accepting iterations
    #[default]
    Running,
    /// Scores settled and the goal is achieved
    Converged,
    /// Scores are falling
    Diverged,
    /// Scores stayed too low for too long
    Escalated,
    /// Iteration cap hit, or stopped on request
    MaxIterationsReached,
}

impl LoopStatus {
    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Converged => "converged",
            Self::Diverged => "diverged",
            Self::Escalated => "escalated",
            Self::MaxIterationsReached => "max_iterations_reached",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics measured from an actual execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualMetrics {
    /// Reviewer quality score (0-100)
    pub quality_score: f64,
    /// Lint errors reported
    pub lint_errors: u32,
    /// Type checker errors reported
    pub type_errors: u32,
    /// Security findings reported
    pub security_issues: u32,
    /// Line coverage percentage (0-100)
    pub test_coverage: f64,
    /// Passing tests
    pub tests_passed: u32,
    /// Failing tests
    #[serde(default)]
    pub tests_failed: u32,
    /// Build wall time
    #[serde(default)]
    pub build_time_ms: u64,
    /// Size of the change
    #[serde(default)]
    pub lines_of_code: u32,
    /// Average cyclomatic complexity
    #[serde(default)]
    pub cyclomatic_complexity: f64,
}

/// Severity of the gap between a measured value and its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    /// Gap of 50% or more
    Critical,
    /// Gap of 25% or more
    High,
    /// Gap of 10% or more
    Medium,
    /// Anything smaller
    Low,
}

/// Distance between expected and actual value for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricGap {
    /// Metric name, e.g. `test_coverage`
    pub metric: String,
    /// Threshold from the goal
    pub expected: f64,
    /// Measured value
    pub actual: f64,
    /// Absolute distance between expected and actual
    pub gap: f64,
    /// Gap relative to the expected value
    pub gap_percentage: f64,
    /// Severity band of the gap percentage
    pub severity: GapSeverity,
}

/// Outcome of checking one success criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Criterion name
    pub criterion: String,
    /// Whether the threshold was met
    pub passed: bool,
    /// Threshold from the goal
    pub expected: f64,
    /// Measured value
    pub actual: f64,
    /// Criterion score (0-100)
    pub score: f64,
    /// One-line human readable verdict
    pub feedback: String,
}

/// Scored comparison of actual metrics against a goal's thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionReport {
    /// Goal the metrics were checked against
    pub goal_id: Uuid,
    /// Execution session that produced the metrics
    pub session_id: String,
    /// 0-100
    pub overall_score: f64,
    /// True when every criterion passed
    pub goal_achieved: bool,
    /// One entry per failed criterion
    #[serde(default)]
    pub gaps: Vec<MetricGap>,
    /// One entry per criterion
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
    /// Suggested fixes, one per failed criterion
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Concrete next steps
    #[serde(default)]
    pub next_actions: Vec<String>,
    /// When the report was produced
    pub timestamp: DateTime<Utc>,
}

impl ConsumptionReport {
    /// A report carrying only a score and achievement flag.
    pub fn scored(goal_id: Uuid, session_id: impl Into<String>, score: f64, achieved: bool) -> Self {
        Self {
            goal_id,
            session_id: session_id.into(),
            overall_score: score,
            goal_achieved: achieved,
            gaps: Vec::new(),
            validation_results: Vec::new(),
            recommendations: Vec::new(),
            next_actions: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Tone of the feedback generated for an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// Goal achieved
    Positive,
    /// Score >= 70
    Constructive,
    /// Score >= 50
    Corrective,
    /// Score < 50
    Escalation,
}

/// Feedback derived from a consumption report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// When the feedback was generated
    pub timestamp: DateTime<Utc>,
    /// Tone picked from the score
    pub feedback_type: FeedbackType,
    /// Overall score the feedback is about
    pub score: f64,
    /// One-line summary
    pub summary: String,
    /// Failed criteria, gaps and recommendations, one line each
    pub details: Vec<String>,
    /// Next actions copied from the report
    pub action_items: Vec<String>,
}

/// One completed iteration of a feedback loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: u32,
    /// When the iteration was committed
    pub timestamp: DateTime<Utc>,
    /// Goal as it was when this iteration ran
    pub goal: Goal,
    /// Validator output for this iteration
    pub consumption_report: ConsumptionReport,
    /// Feedback generated from the report
    pub feedback: FeedbackRecord,
    /// Time spent validating
    pub duration_ms: u64,
    /// Score delta against the previous iteration (previous is 0 for the first)
    pub score_improvement: f64,
}

/// Statistics over a loop's score history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    /// Overall score per iteration, oldest first
    pub score_history: Vec<f64>,
    /// Population variance of the score history
    pub score_variance: f64,
    /// Average score change per iteration over the trailing window
    pub improvement_rate: f64,
    /// Scores have settled
    pub is_converging: bool,
    /// Iterations left until the score reaches 90 at the current rate.
    ///
    /// `None` while converging or when the rate is not positive. A score
    /// already at or above 90 yields `Some(0)`.
    pub estimated_iterations_to_converge: Option<u32>,
}

/// An iterative improvement loop bound to one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackLoop {
    /// Unique loop identifier
    pub loop_id: Uuid,
    /// Goal this loop drives
    pub goal_id: Uuid,
    /// Number of completed iterations
    pub iteration: u32,
    /// Iteration cap
    pub max_iterations: u32,
    /// When the loop was started
    pub start_time: DateTime<Utc>,
    /// When the last iteration was committed
    pub last_iteration_time: DateTime<Utc>,
    /// Lifecycle status
    pub status: LoopStatus,
    /// Set when `stop_loop` ended the loop, as opposed to convergence,
    /// divergence, escalation or the iteration cap
    #[serde(default)]
    pub stopped_by_request: bool,
    /// Append-only
    pub iterations: Vec<IterationRecord>,
    /// Statistics over the score history
    pub convergence_metrics: ConvergenceMetrics,
    /// Whether stagnating or diverging loops refine their goal
    pub auto_refinement_enabled: bool,
    /// Append-only
    pub refinement_history: Vec<GoalRefinement>,
}

impl FeedbackLoop {
    /// Create a running loop with no iterations.
    pub fn new(goal_id: Uuid, max_iterations: u32, auto_refinement_enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            loop_id: Uuid::new_v4(),
            goal_id,
            iteration: 0,
            max_iterations,
            start_time: now,
            last_iteration_time: now,
            status: LoopStatus::Running,
            stopped_by_request: false,
            iterations: Vec::new(),
            convergence_metrics: ConvergenceMetrics::default(),
            auto_refinement_enabled,
            refinement_history: Vec::new(),
        }
    }

    /// Whether the loop still accepts iterations.
    pub fn is_running(&self) -> bool {
        self.status == LoopStatus::Running
    }

    /// Score of the most recent iteration, if any.
    pub fn last_score(&self) -> Option<f64> {
        self.iterations
            .last()
            .map(|it| it.consumption_report.overall_score)
    }

    /// Whether the cap leaves room for another iteration.
    pub fn has_iterations_left(&self) -> bool {
        self.iteration < self.max_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_loop_is_running() {
        let lp = FeedbackLoop::new(Uuid::new_v4(), 10, true);
        assert!(lp.is_running());
        assert_eq!(lp.iteration, 0);
        assert!(lp.last_score().is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!LoopStatus::Running.is_terminal());
        for status in [
            LoopStatus::Converged,
            LoopStatus::Diverged,
            LoopStatus::Escalated,
            LoopStatus::MaxIterationsReached,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&LoopStatus::MaxIterationsReached).unwrap();
        assert_eq!(json, "\"max_iterations_reached\"");
    }
}
