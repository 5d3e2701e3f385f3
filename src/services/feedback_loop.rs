//! Feedback loop orchestrator.
//!
//! Drives goals through repeated validate → feedback → converge iterations.
//! The orchestrator is the single writer of loop state and owns the goal
//! store. Locks are released before any port call (validator, store,
//! notifier) is awaited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActualMetrics, ConsumptionReport, Escalation, FeedbackLoop, FeedbackLoopConfig, FeedbackRecord,
    FeedbackType, GapSeverity, Goal, IterationRecord, LoopStatus,
};
use crate::domain::ports::{EscalationNotifier, GoalValidator, ReportStore};
use crate::services::convergence_engine::ConvergenceEngine;
use crate::services::escalation_policy;
use crate::services::goal_refinement::GoalRefinementEngine;
use crate::services::goal_store::GoalStore;

const CONSTRUCTIVE_SCORE: f64 = 70.0;
const CORRECTIVE_SCORE: f64 = 50.0;

/// Build the feedback for a consumption report.
pub fn generate_feedback(report: &ConsumptionReport) -> FeedbackRecord {
    let score = report.overall_score;
    let feedback_type = if report.goal_achieved {
        FeedbackType::Positive
    } else if score >= CONSTRUCTIVE_SCORE {
        FeedbackType::Constructive
    } else if score >= CORRECTIVE_SCORE {
        FeedbackType::Corrective
    } else {
        FeedbackType::Escalation
    };

    let summary = match feedback_type {
        FeedbackType::Positive => format!("Goal achieved. Score: {score:.1}/100. All criteria met."),
        FeedbackType::Constructive => format!(
            "Good progress. Score: {score:.1}/100. {} gap(s) remaining.",
            report.gaps.len()
        ),
        FeedbackType::Corrective => {
            let urgent = report
                .gaps
                .iter()
                .filter(|g| matches!(g.severity, GapSeverity::Critical | GapSeverity::High))
                .count();
            format!("Needs improvement. Score: {score:.1}/100. Focus on {urgent} high-priority gap(s).")
        }
        FeedbackType::Escalation => {
            format!("Critical issues detected. Score: {score:.1}/100. Immediate action required.")
        }
    };

    let mut details = Vec::new();
    let failures: Vec<_> = report.validation_results.iter().filter(|v| !v.passed).collect();
    if !failures.is_empty() {
        details.push(format!("Failed {} criteria:", failures.len()));
        details.extend(failures.iter().map(|f| format!("  - {}", f.feedback)));
    }
    if !report.gaps.is_empty() {
        details.push("Gap analysis:".to_string());
        details.extend(report.gaps.iter().map(|g| {
            format!(
                "  - {}: gap of {:.1} ({:.1}%) - {:?}",
                g.metric, g.gap, g.gap_percentage, g.severity
            )
        }));
    }
    if !report.recommendations.is_empty() {
        details.push("Recommendations:".to_string());
        details.extend(report.recommendations.iter().map(|r| format!("  - {r}")));
    }

    FeedbackRecord {
        timestamp: Utc::now(),
        feedback_type,
        score,
        summary,
        details,
        action_items: report.next_actions.clone(),
    }
}

/// Result of committing an iteration under the loop lock.
struct Committed {
    record: IterationRecord,
    snapshot: FeedbackLoop,
    refined_goal: Option<Goal>,
    escalation: Option<Escalation>,
}

/// Orchestrates convergence-driven feedback loops.
pub struct FeedbackLoopOrchestrator {
    config: FeedbackLoopConfig,
    goals: GoalStore,
    validator: Arc<dyn GoalValidator>,
    convergence: ConvergenceEngine,
    refinement: GoalRefinementEngine,
    loops: RwLock<HashMap<Uuid, FeedbackLoop>>,
    report_store: Option<Arc<dyn ReportStore>>,
    notifier: Option<Arc<dyn EscalationNotifier>>,
}

impl FeedbackLoopOrchestrator {
    /// Orchestrator validating iterations with `validator`.
    pub fn new(config: FeedbackLoopConfig, validator: Arc<dyn GoalValidator>) -> Self {
        Self {
            convergence: ConvergenceEngine::new(config.clone()),
            config,
            goals: GoalStore::new(),
            validator,
            refinement: GoalRefinementEngine::new(),
            loops: RwLock::new(HashMap::new()),
            report_store: None,
            notifier: None,
        }
    }

    /// Auto-save loop and iteration snapshots to `store`.
    pub fn with_report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.report_store = Some(store);
        self
    }

    /// Deliver loop escalations through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn EscalationNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The goal store this orchestrator reads and refines.
    pub fn goals(&self) -> &GoalStore {
        &self.goals
    }

    /// Start a new loop for a registered goal.
    #[instrument(skip(self))]
    pub async fn start_loop(&self, goal_id: Uuid) -> DomainResult<FeedbackLoop> {
        self.goals.get(goal_id).await?;

        let feedback_loop = FeedbackLoop::new(
            goal_id,
            self.config.max_iterations,
            self.config.auto_refinement_enabled,
        );
        self.loops
            .write()
            .await
            .insert(feedback_loop.loop_id, feedback_loop.clone());

        info!(loop_id = %feedback_loop.loop_id, max_iterations = feedback_loop.max_iterations, "feedback loop started");
        self.save_loop(&feedback_loop).await;
        Ok(feedback_loop)
    }

    /// Run one iteration: validate metrics, generate feedback, update
    /// convergence state and possibly refine the goal.
    ///
    /// Fails with `IllegalLoopTransition` unless the loop is running with
    /// iterations left, both when the call starts and when it commits. The
    /// one exception is a `stop_loop` landing while the iteration is in
    /// flight: the iteration is still recorded, but the status is left alone.
    #[instrument(skip(self, metrics))]
    pub async fn execute_iteration(
        &self,
        loop_id: Uuid,
        session_id: &str,
        metrics: &ActualMetrics,
    ) -> DomainResult<IterationRecord> {
        let started = Instant::now();

        let goal_id = {
            let loops = self.loops.read().await;
            let feedback_loop = loops.get(&loop_id).ok_or(DomainError::LoopNotFound(loop_id))?;
            if !feedback_loop.is_running() || !feedback_loop.has_iterations_left() {
                return Err(DomainError::IllegalLoopTransition {
                    loop_id,
                    status: feedback_loop.status,
                });
            }
            feedback_loop.goal_id
        };

        let goal = self.goals.get(goal_id).await?;
        let report = self.validator.validate(&goal, metrics, session_id).await?;
        let feedback = generate_feedback(&report);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let committed = {
            let mut loops = self.loops.write().await;
            let feedback_loop = loops.get_mut(&loop_id).ok_or(DomainError::LoopNotFound(loop_id))?;
            let was_running = feedback_loop.is_running();
            // Another iteration may have committed while this one validated.
            if !(was_running || feedback_loop.stopped_by_request)
                || !feedback_loop.has_iterations_left()
            {
                warn!(
                    status = %feedback_loop.status,
                    iteration = feedback_loop.iteration,
                    "discarding overlapping iteration"
                );
                return Err(DomainError::IllegalLoopTransition {
                    loop_id,
                    status: feedback_loop.status,
                });
            }
            let score = report.overall_score;

            let record = IterationRecord {
                iteration: feedback_loop.iteration + 1,
                timestamp: Utc::now(),
                goal: goal.clone(),
                score_improvement: score - feedback_loop.last_score().unwrap_or(0.0),
                consumption_report: report,
                feedback,
                duration_ms,
            };

            feedback_loop.iterations.push(record.clone());
            feedback_loop.iteration += 1;
            feedback_loop.last_iteration_time = record.timestamp;
            feedback_loop.convergence_metrics = self.convergence.update_metrics(feedback_loop);

            let mut refined_goal = None;
            let mut escalation = None;
            if was_running {
                feedback_loop.status = self
                    .convergence
                    .determine_status(feedback_loop, &record.consumption_report);

                if feedback_loop.auto_refinement_enabled
                    && self
                        .refinement
                        .should_refine(feedback_loop, &record.consumption_report)
                {
                    let (refined, refinement) =
                        self.refinement
                            .refine(feedback_loop, &record.consumption_report, &goal);
                    feedback_loop.refinement_history.push(refinement);
                    refined_goal = Some(refined);
                }

                if feedback_loop.status == LoopStatus::Escalated {
                    escalation = Some(escalation_policy::for_loop(feedback_loop, score));
                }
            }

            Committed {
                record,
                snapshot: feedback_loop.clone(),
                refined_goal,
                escalation,
            }
        };

        if let Some(refined) = committed.refined_goal {
            if let Err(e) = self.goals.update(refined).await {
                warn!(goal_id = %goal_id, error = %e, "failed to store refined goal");
            }
        }

        if let Some(escalation) = &committed.escalation {
            self.notify(escalation).await;
        }

        info!(
            iteration = committed.record.iteration,
            score = committed.record.consumption_report.overall_score,
            improvement = committed.record.score_improvement,
            status = %committed.snapshot.status,
            "iteration completed"
        );

        self.save_loop(&committed.snapshot).await;
        self.save(
            &format!("iteration-{}-{}", loop_id, committed.record.iteration),
            &committed.record,
        )
        .await;

        Ok(committed.record)
    }

    /// Snapshot of a loop.
    pub async fn get_loop(&self, loop_id: Uuid) -> DomainResult<FeedbackLoop> {
        self.loops
            .read()
            .await
            .get(&loop_id)
            .cloned()
            .ok_or(DomainError::LoopNotFound(loop_id))
    }

    /// Stop a running loop. Terminal loops are returned unchanged.
    #[instrument(skip(self))]
    pub async fn stop_loop(&self, loop_id: Uuid) -> DomainResult<FeedbackLoop> {
        let (snapshot, stopped) = {
            let mut loops = self.loops.write().await;
            let feedback_loop = loops.get_mut(&loop_id).ok_or(DomainError::LoopNotFound(loop_id))?;
            let stopped = feedback_loop.is_running();
            if stopped {
                feedback_loop.status = LoopStatus::MaxIterationsReached;
                feedback_loop.stopped_by_request = true;
            }
            (feedback_loop.clone(), stopped)
        };

        if stopped {
            info!("feedback loop stopped");
            self.save_loop(&snapshot).await;
        }
        Ok(snapshot)
    }

    /// Whether another iteration should run. False for unknown loops.
    pub async fn should_continue(&self, loop_id: Uuid) -> bool {
        self.loops.read().await.get(&loop_id).is_some_and(|lp| {
            lp.is_running()
                && lp.iteration < lp.max_iterations
                && !lp.convergence_metrics.is_converging
        })
    }

    /// Loops still running, oldest first.
    pub async fn active_loops(&self) -> Vec<FeedbackLoop> {
        let mut active: Vec<FeedbackLoop> = self
            .loops
            .read()
            .await
            .values()
            .filter(|lp| lp.is_running())
            .cloned()
            .collect();
        active.sort_by_key(|lp| lp.start_time);
        active
    }

    async fn notify(&self, escalation: &Escalation) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.notify(escalation).await {
            warn!(target_role = %escalation.target, error = %e, "escalation delivery failed");
        }
    }

    async fn save_loop(&self, feedback_loop: &FeedbackLoop) {
        self.save(&format!("loop-{}", feedback_loop.loop_id), feedback_loop)
            .await;
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, record: &T) {
        if !self.config.auto_save {
            return;
        }
        let Some(store) = &self.report_store else {
            return;
        };
        let stored = match serde_json::to_value(record) {
            Ok(value) => store.put(key, &value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            warn!(key = %key, error = %e, "failed to save snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MetricGap, ValidationResult};

    fn report(score: f64, achieved: bool) -> ConsumptionReport {
        ConsumptionReport::scored(Uuid::new_v4(), "s", score, achieved)
    }

    #[test]
    fn test_feedback_types() {
        assert_eq!(generate_feedback(&report(95.0, true)).feedback_type, FeedbackType::Positive);
        assert_eq!(generate_feedback(&report(70.0, false)).feedback_type, FeedbackType::Constructive);
        assert_eq!(generate_feedback(&report(50.0, false)).feedback_type, FeedbackType::Corrective);
        assert_eq!(generate_feedback(&report(49.9, false)).feedback_type, FeedbackType::Escalation);
    }

    #[test]
    fn test_feedback_details_list_failures_and_gaps() {
        let mut r = report(60.0, false);
        r.validation_results.push(ValidationResult {
            criterion: "test_coverage".into(),
            passed: false,
            expected: 80.0,
            actual: 40.0,
            score: 50.0,
            feedback: "test_coverage: 40 but expected at least 80".into(),
        });
        r.gaps.push(MetricGap {
            metric: "test_coverage".into(),
            expected: 80.0,
            actual: 40.0,
            gap: 40.0,
            gap_percentage: 50.0,
            severity: GapSeverity::Critical,
        });
        r.next_actions.push("Bring test_coverage to 80".into());

        let feedback = generate_feedback(&r);

        assert!(feedback.summary.contains("Focus on 1 high-priority gap(s)"));
        assert_eq!(feedback.details[0], "Failed 1 criteria:");
        assert!(feedback.details.iter().any(|d| d.contains("gap of 40.0 (50.0%)")));
        assert_eq!(feedback.action_items, vec!["Bring test_coverage to 80"]);
    }
}
