//! Escalation notification port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Escalation;

/// Delivers escalation records to their target role.
///
/// Delivery is fire-and-forget: callers log failures and continue.
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    /// Deliver one escalation.
    async fn notify(&self, escalation: &Escalation) -> DomainResult<()>;
}
