//! In-memory goal registry.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalPriority, SuccessCriteria};

/// Authoritative store of goals for a feedback loop orchestrator.
///
/// Refinement writes the refined goal back here, so every later iteration
/// reads the current thresholds.
#[derive(Debug, Default)]
pub struct GoalStore {
    goals: RwLock<HashMap<Uuid, Goal>>,
}

impl GoalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing goal, replacing any goal with the same id.
    #[instrument(skip(self, goal), fields(goal_id = %goal.id))]
    pub async fn register(&self, goal: Goal) -> DomainResult<Uuid> {
        goal.validate().map_err(DomainError::ValidationFailed)?;
        let id = goal.id;
        self.goals.write().await.insert(id, goal);
        info!("goal registered");
        Ok(id)
    }

    /// Create and register a goal.
    pub async fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        criteria: SuccessCriteria,
        priority: GoalPriority,
    ) -> DomainResult<Goal> {
        let goal = Goal::new(title, description)
            .with_criteria(criteria)
            .with_priority(priority);
        self.register(goal.clone()).await?;
        Ok(goal)
    }

    /// Clone of a stored goal.
    pub async fn get(&self, id: Uuid) -> DomainResult<Goal> {
        self.goals
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DomainError::GoalNotFound(id))
    }

    /// Replace a stored goal in place.
    pub async fn update(&self, mut goal: Goal) -> DomainResult<()> {
        goal.validate().map_err(DomainError::ValidationFailed)?;
        let mut goals = self.goals.write().await;
        let slot = goals.get_mut(&goal.id).ok_or(DomainError::GoalNotFound(goal.id))?;
        goal.updated_at = Utc::now();
        *slot = goal;
        Ok(())
    }

    /// All goals, highest priority first.
    pub async fn list(&self) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self.goals.read().await.values().cloned().collect();
        goals.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        goals
    }

    /// Remove and return a goal.
    pub async fn remove(&self, id: Uuid) -> DomainResult<Goal> {
        self.goals
            .write()
            .await
            .remove(&id)
            .ok_or(DomainError::GoalNotFound(id))
    }
}
