//! Notifier that keeps every escalation in memory.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::Escalation;
use crate::domain::ports::EscalationNotifier;

/// Notifier that records escalations instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: RwLock<Vec<Escalation>>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalations in delivery order.
    pub async fn escalations(&self) -> Vec<Escalation> {
        self.delivered.read().await.clone()
    }
}

#[async_trait]
impl EscalationNotifier for RecordingNotifier {
    async fn notify(&self, escalation: &Escalation) -> DomainResult<()> {
        self.delivered.write().await.push(escalation.clone());
        Ok(())
    }
}
