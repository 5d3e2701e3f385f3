//! Convergence engine service.
//!
//! Turns a loop's score history into convergence statistics and decides the
//! loop's next status. Everything here is pure; the feedback loop
//! orchestrator owns the state and applies the results.

use crate::domain::models::{
    ConsumptionReport, ConvergenceMetrics, FeedbackLoop, FeedbackLoopConfig, LoopStatus,
};

/// Number of trailing scores used for the improvement rate.
pub const IMPROVEMENT_WINDOW: usize = 5;

/// Improvement rate below which a loop counts as settled.
pub const STALL_RATE: f64 = 0.5;

/// Improvement rate below which a loop counts as diverging.
pub const DIVERGENCE_RATE: f64 = -1.0;

/// Score the iteration estimate aims for.
pub const TARGET_SCORE: f64 = 90.0;

/// Scores below this escalate once enough iterations have run.
pub const ESCALATION_SCORE: f64 = 40.0;

/// Iterations required before a low score escalates.
pub const ESCALATION_MIN_ITERATIONS: u32 = 5;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Population variance of a score history; 0 when empty.
pub fn score_variance(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n
}

/// Average change per iteration over the trailing window.
///
/// `(last - first) / window_len` over the last five scores, or all of them
/// when fewer. 0 with fewer than two scores.
pub fn improvement_rate(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let window = &scores[scores.len().saturating_sub(IMPROVEMENT_WINDOW)..];
    match (window.first(), window.last()) {
        (Some(first), Some(last)) => (last - first) / window.len() as f64,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// ConvergenceEngine
// ---------------------------------------------------------------------------

/// Convergence statistics and loop status decisions.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceEngine {
    config: FeedbackLoopConfig,
}

impl ConvergenceEngine {
    /// Create an engine using the loop thresholds from `config`.
    pub fn new(config: FeedbackLoopConfig) -> Self {
        Self { config }
    }

    /// Recompute convergence metrics from the loop's iterations.
    ///
    /// The iteration estimate is `ceil((TARGET_SCORE - current) / rate)`,
    /// clamped at zero: a loop still climbing past the target reports
    /// `Some(0)` rather than a negative count.
    pub fn update_metrics(&self, feedback_loop: &FeedbackLoop) -> ConvergenceMetrics {
        let score_history: Vec<f64> = feedback_loop
            .iterations
            .iter()
            .map(|it| it.consumption_report.overall_score)
            .collect();

        let score_variance = score_variance(&score_history);
        let improvement_rate = improvement_rate(&score_history);
        let is_converging = feedback_loop.iteration
            >= self.config.min_iterations_before_convergence
            && score_variance < self.config.convergence_threshold
            && improvement_rate < STALL_RATE;

        let estimated_iterations_to_converge = match score_history.last() {
            Some(current) if !is_converging && improvement_rate > 0.0 => {
                let remaining = ((TARGET_SCORE - current) / improvement_rate).ceil().max(0.0);
                Some(remaining as u32)
            }
            _ => None,
        };

        ConvergenceMetrics {
            score_history,
            score_variance,
            improvement_rate,
            is_converging,
            estimated_iterations_to_converge,
        }
    }

    /// Decide the loop status after an iteration.
    ///
    /// Rules apply in order: iteration cap, convergence with the goal met,
    /// divergence, sustained low score. Otherwise the loop keeps running.
    pub fn determine_status(
        &self,
        feedback_loop: &FeedbackLoop,
        report: &ConsumptionReport,
    ) -> LoopStatus {
        let metrics = &feedback_loop.convergence_metrics;

        if feedback_loop.iteration >= feedback_loop.max_iterations {
            LoopStatus::MaxIterationsReached
        } else if metrics.is_converging && report.goal_achieved {
            LoopStatus::Converged
        } else if feedback_loop.iteration >= self.config.min_iterations_before_convergence
            && metrics.improvement_rate < DIVERGENCE_RATE
        {
            LoopStatus::Diverged
        } else if report.overall_score < ESCALATION_SCORE
            && feedback_loop.iteration >= ESCALATION_MIN_ITERATIONS
        {
            LoopStatus::Escalated
        } else {
            LoopStatus::Running
        }
    }
}
