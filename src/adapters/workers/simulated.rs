//! Simulated specialist worker for dry runs and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, WorkerOutcome, WorkerType};
use crate::domain::ports::SpecialistWorker;

/// What a simulated worker returns for a task.
#[derive(Debug, Clone)]
pub enum SimulatedResponse {
    /// Return this outcome.
    Outcome(WorkerOutcome),
    /// Return `DomainError::WorkerFailed` with this message.
    Error(String),
}

impl Default for SimulatedResponse {
    fn default() -> Self {
        Self::Outcome(WorkerOutcome::success(json!({ "simulated": true })))
    }
}

impl SimulatedResponse {
    /// Successful outcome with a `simulated` marker.
    pub fn success() -> Self {
        Self::default()
    }

    /// Failed outcome with an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Outcome(WorkerOutcome::failed(error))
    }

    /// Worker error instead of an outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Worker that answers from configured responses after an optional delay.
pub struct SimulatedWorker {
    worker_type: WorkerType,
    default_response: SimulatedResponse,
    response_overrides: RwLock<HashMap<String, SimulatedResponse>>,
    delay: Duration,
    executed: RwLock<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl SimulatedWorker {
    /// Worker of the given type that succeeds immediately.
    pub fn new(worker_type: WorkerType) -> Self {
        Self {
            worker_type,
            default_response: SimulatedResponse::default(),
            response_overrides: RwLock::new(HashMap::new()),
            delay: Duration::ZERO,
            executed: RwLock::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Response for tasks without an override.
    pub fn with_default_response(mut self, response: SimulatedResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wrap in an `Arc` for registration.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Set a specific response for a task id.
    pub async fn set_response_for_task(&self, task_id: impl Into<String>, response: SimulatedResponse) {
        self.response_overrides
            .write()
            .await
            .insert(task_id.into(), response);
    }

    async fn response_for(&self, task_id: &str) -> SimulatedResponse {
        self.response_overrides
            .read()
            .await
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }

    /// Task ids in the order they started.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }

    /// Highest number of tasks this worker ran at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpecialistWorker for SimulatedWorker {
    fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    async fn execute(&self, task: &Task) -> DomainResult<WorkerOutcome> {
        self.executed.write().await.push(task.id.clone());
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.response_for(&task.id).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        match response {
            SimulatedResponse::Outcome(outcome) => Ok(outcome),
            SimulatedResponse::Error(message) => Err(DomainError::WorkerFailed(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::OutcomeStatus;

    #[tokio::test]
    async fn test_default_and_override_responses() {
        let worker = SimulatedWorker::new(WorkerType::Review);
        worker
            .set_response_for_task("bad", SimulatedResponse::error("exploded"))
            .await;

        let ok = worker.execute(&Task::new("good", "g")).await.unwrap();
        assert_eq!(ok.status, OutcomeStatus::Success);

        let err = worker.execute(&Task::new("bad", "b")).await.unwrap_err();
        assert!(matches!(err, DomainError::WorkerFailed(m) if m == "exploded"));

        assert_eq!(worker.executed().await, vec!["good", "bad"]);
        assert_eq!(worker.peak_concurrency(), 1);
    }
}
