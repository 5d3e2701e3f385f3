//! Notifier that logs escalations.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Escalation, Severity};
use crate::domain::ports::EscalationNotifier;

/// Emits each escalation as a structured log event.
///
/// Sev.1 and Sev.2 log at error level, the rest at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl EscalationNotifier for TracingNotifier {
    async fn notify(&self, escalation: &Escalation) -> DomainResult<()> {
        let context = escalation.context.to_string();
        match escalation.severity {
            Severity::Critical | Severity::High => tracing::error!(
                target_role = %escalation.target,
                severity = %escalation.severity,
                context = %context,
                "escalation: {}",
                escalation.reason
            ),
            Severity::Medium | Severity::Low | Severity::Trivial => tracing::warn!(
                target_role = %escalation.target,
                severity = %escalation.severity,
                context = %context,
                "escalation: {}",
                escalation.reason
            ),
        }
        Ok(())
    }
}
