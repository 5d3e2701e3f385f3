//! Goal validator port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActualMetrics, ConsumptionReport, Goal};

/// Scores measured metrics against a goal's success criteria.
#[async_trait]
pub trait GoalValidator: Send + Sync {
    /// Produce a consumption report with an `overall_score` in 0-100.
    async fn validate(
        &self,
        goal: &Goal,
        metrics: &ActualMetrics,
        session_id: &str,
    ) -> DomainResult<ConsumptionReport>;
}
