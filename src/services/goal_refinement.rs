//! Automatic goal refinement for stagnating or diverging loops.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::domain::models::{
    ConsumptionReport, FeedbackLoop, Goal, GoalRefinement, LoopStatus, RefinementChange,
};

/// Scores below this relax the quality threshold.
const RELAX_BELOW_SCORE: f64 = 70.0;

/// Step by which the quality threshold is lowered.
const RELAX_STEP: f64 = 10.0;

/// The quality threshold is never lowered past this floor.
const QUALITY_FLOOR: f64 = 50.0;

const MIN_ITERATIONS: u32 = 3;
const STAGNATION_ITERATIONS: u32 = 5;
const STAGNATION_VARIANCE: f64 = 5.0;

/// Decides when a goal should be relaxed and produces the refined goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalRefinementEngine;

impl GoalRefinementEngine {
    /// Create a refinement engine.
    pub fn new() -> Self {
        Self
    }

    /// Whether the loop warrants refining its goal.
    ///
    /// Never before the third iteration or while converging. Diverged loops
    /// refine; so do loops stuck below the goal with low variance from the
    /// fifth iteration on.
    pub fn should_refine(&self, feedback_loop: &FeedbackLoop, report: &ConsumptionReport) -> bool {
        let metrics = &feedback_loop.convergence_metrics;

        if feedback_loop.iteration < MIN_ITERATIONS || metrics.is_converging {
            return false;
        }
        if feedback_loop.status == LoopStatus::Diverged {
            return true;
        }
        !report.goal_achieved
            && metrics.score_variance < STAGNATION_VARIANCE
            && feedback_loop.iteration >= STAGNATION_ITERATIONS
    }

    /// Refine a goal against the latest report.
    ///
    /// The quality threshold only moves down, by 10 and never below 50. The
    /// returned record carries both goal snapshots; its change list is empty
    /// when nothing needed adjusting.
    pub fn refine(
        &self,
        feedback_loop: &FeedbackLoop,
        report: &ConsumptionReport,
        goal: &Goal,
    ) -> (Goal, GoalRefinement) {
        let mut refined = goal.clone();
        let mut changes = Vec::new();

        let before = goal.success_criteria.min_quality_score;
        if report.overall_score < RELAX_BELOW_SCORE && before > QUALITY_FLOOR {
            let after = (before - RELAX_STEP).max(QUALITY_FLOOR);
            refined.success_criteria.min_quality_score = after;
            refined.updated_at = Utc::now();
            changes.push(RefinementChange {
                field: "success_criteria.min_quality_score".to_string(),
                before: json!(before),
                after: json!(after),
                reason: format!(
                    "Score {:.1} is below {RELAX_BELOW_SCORE}; relaxed to stay achievable",
                    report.overall_score
                ),
            });
        }

        let reason = if feedback_loop.status == LoopStatus::Diverged {
            "Auto-refinement after divergence"
        } else {
            "Auto-refinement after stagnation"
        };

        info!(
            loop_id = %feedback_loop.loop_id,
            goal_id = %goal.id,
            changes = changes.len(),
            "goal refined"
        );

        let refinement = GoalRefinement {
            timestamp: Utc::now(),
            reason: reason.to_string(),
            original_goal: goal.clone(),
            refined_goal: refined.clone(),
            changes,
            expected_impact: "Higher achievability while keeping the quality floor".to_string(),
        };

        (refined, refinement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ConvergenceMetrics;

    fn looped(iteration: u32, variance: f64, status: LoopStatus) -> FeedbackLoop {
        let mut lp = FeedbackLoop::new(uuid::Uuid::new_v4(), 10, true);
        lp.iteration = iteration;
        lp.status = status;
        lp.convergence_metrics = ConvergenceMetrics {
            score_variance: variance,
            ..ConvergenceMetrics::default()
        };
        lp
    }

    fn report(score: f64) -> ConsumptionReport {
        ConsumptionReport::scored(uuid::Uuid::new_v4(), "s", score, false)
    }

    #[test]
    fn test_no_refinement_too_early() {
        let engine = GoalRefinementEngine::new();
        assert!(!engine.should_refine(&looped(2, 0.0, LoopStatus::Diverged), &report(60.0)));
    }

    #[test]
    fn test_refine_on_divergence() {
        let engine = GoalRefinementEngine::new();
        assert!(engine.should_refine(&looped(3, 40.0, LoopStatus::Diverged), &report(60.0)));
    }

    #[test]
    fn test_refine_on_stagnation() {
        let engine = GoalRefinementEngine::new();
        assert!(!engine.should_refine(&looped(4, 1.0, LoopStatus::Running), &report(65.0)));
        assert!(engine.should_refine(&looped(5, 1.0, LoopStatus::Running), &report(65.0)));
        assert!(!engine.should_refine(&looped(5, 8.0, LoopStatus::Running), &report(65.0)));
    }

    #[test]
    fn test_lowers_threshold_by_ten() {
        let engine = GoalRefinementEngine::new();
        let goal = Goal::new("g", "");
        let (refined, record) = engine.refine(&looped(5, 1.0, LoopStatus::Running), &report(65.0), &goal);

        assert!((refined.success_criteria.min_quality_score - 70.0).abs() < f64::EPSILON);
        assert_eq!(record.changes.len(), 1);
        assert_eq!(record.changes[0].before, json!(80.0));
        assert_eq!(record.changes[0].after, json!(70.0));
        assert_eq!(record.original_goal, goal);
    }

    #[test]
    fn test_floor_is_respected_and_never_raised() {
        let engine = GoalRefinementEngine::new();
        let lp = looped(5, 1.0, LoopStatus::Running);

        let mut goal = Goal::new("g", "");
        goal.success_criteria.min_quality_score = 55.0;
        let (refined, _) = engine.refine(&lp, &report(40.0), &goal);
        assert!((refined.success_criteria.min_quality_score - 50.0).abs() < f64::EPSILON);

        goal.success_criteria.min_quality_score = 30.0;
        let (refined, record) = engine.refine(&lp, &report(40.0), &goal);
        assert!((refined.success_criteria.min_quality_score - 30.0).abs() < f64::EPSILON);
        assert!(record.changes.is_empty());
    }

    #[test]
    fn test_high_score_records_empty_change_list() {
        let engine = GoalRefinementEngine::new();
        let goal = Goal::new("g", "");
        let (refined, record) = engine.refine(&looped(5, 1.0, LoopStatus::Running), &report(75.0), &goal);

        assert_eq!(refined.success_criteria, goal.success_criteria);
        assert!(record.changes.is_empty());
    }
}
