//! Escalation decisions.
//!
//! Pure functions mapping findings to escalation records. Delivery is the
//! caller's job, through an `EscalationNotifier`.

use serde_json::json;

use crate::domain::models::{
    Escalation, EscalationTarget, FeedbackLoop, Severity, Task, WorkerMetrics,
};

/// Quality scores below this escalate.
pub const QUALITY_ESCALATION_THRESHOLD: f64 = 50.0;

/// Escalation for a dependency cycle found during decomposition.
pub fn for_cycle(cycle: &[String]) -> Escalation {
    Escalation::new(
        format!("Circular dependency detected: {}", cycle.join(" -> ")),
        EscalationTarget::TechLead,
        Severity::High,
        json!({ "cycle": cycle }),
    )
}

/// Escalation for quality findings reported by a worker, if any.
///
/// A score below 50 or any critical issue escalates at Sev.1. Critical
/// security issues route to the CISO, everything else to the tech lead.
pub fn for_quality(task: &Task, metrics: &WorkerMetrics) -> Option<Escalation> {
    let low_score = metrics
        .quality_score
        .is_some_and(|score| score < QUALITY_ESCALATION_THRESHOLD);
    let critical = metrics.critical_issues > 0 || metrics.critical_security_issues > 0;

    if !low_score && !critical {
        return None;
    }

    let (target, reason) = if metrics.critical_security_issues > 0 {
        (
            EscalationTarget::Ciso,
            format!(
                "{} critical security issue(s) found in task {}",
                metrics.critical_security_issues, task.id
            ),
        )
    } else if critical {
        (
            EscalationTarget::TechLead,
            format!("{} critical issue(s) found in task {}", metrics.critical_issues, task.id),
        )
    } else {
        (
            EscalationTarget::TechLead,
            format!(
                "Quality score {:.1} below {} for task {}",
                metrics.quality_score.unwrap_or_default(),
                QUALITY_ESCALATION_THRESHOLD,
                task.id
            ),
        )
    };

    Some(Escalation::new(
        reason,
        target,
        Severity::Critical,
        json!({
            "task_id": task.id,
            "quality_score": metrics.quality_score,
            "critical_issues": metrics.critical_issues,
            "critical_security_issues": metrics.critical_security_issues,
        }),
    ))
}

/// Escalation for a feedback loop that entered the escalated status.
pub fn for_loop(feedback_loop: &FeedbackLoop, score: f64) -> Escalation {
    Escalation::new(
        format!(
            "Feedback loop {} escalated at iteration {} with score {:.1}",
            feedback_loop.loop_id, feedback_loop.iteration, score
        ),
        EscalationTarget::TechLead,
        Severity::High,
        json!({
            "loop_id": feedback_loop.loop_id,
            "goal_id": feedback_loop.goal_id,
            "iteration": feedback_loop.iteration,
            "score": score,
        }),
    )
}
