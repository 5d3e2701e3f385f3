//! Common test utilities for integration tests
//!
//! Fake workers and validators shared by the scheduler and feedback loop
//! integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use shepherd::domain::errors::{DomainError, DomainResult};
use shepherd::domain::models::{
    ActualMetrics, ConsumptionReport, Goal, Task, WorkerOutcome, WorkerType,
};
use shepherd::domain::ports::{GoalValidator, SpecialistWorker};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// Start and end instants of one task execution.
#[derive(Debug, Clone)]
pub struct Span {
    pub task_id: String,
    pub start: Instant,
    pub end: Instant,
}

/// Worker that sleeps and records when each task ran.
pub struct TimelineWorker {
    worker_type: WorkerType,
    delay: Duration,
    spans: Mutex<Vec<Span>>,
}

impl TimelineWorker {
    pub fn new(worker_type: WorkerType, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            worker_type,
            delay,
            spans: Mutex::new(Vec::new()),
        })
    }

    pub async fn spans(&self) -> Vec<Span> {
        self.spans.lock().await.clone()
    }

    pub async fn span(&self, task_id: &str) -> Option<Span> {
        self.spans
            .lock()
            .await
            .iter()
            .find(|s| s.task_id == task_id)
            .cloned()
    }
}

#[async_trait]
impl SpecialistWorker for TimelineWorker {
    fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    async fn execute(&self, task: &Task) -> DomainResult<WorkerOutcome> {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.spans.lock().await.push(Span {
            task_id: task.id.clone(),
            start,
            end: Instant::now(),
        });
        Ok(WorkerOutcome::success(serde_json::json!({ "task": task.id })))
    }
}

/// Worker that panics on every task.
pub struct PanickingWorker;

#[async_trait]
impl SpecialistWorker for PanickingWorker {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Review
    }

    async fn execute(&self, task: &Task) -> DomainResult<WorkerOutcome> {
        panic!("review worker crashed on {}", task.id);
    }
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Validator that returns a scripted sequence of scores.
///
/// A score counts as achieving the goal when it meets the goal's current
/// `min_quality_score`.
pub struct ScriptedValidator {
    scores: Mutex<VecDeque<f64>>,
}

impl ScriptedValidator {
    pub fn new(scores: &[f64]) -> Arc<Self> {
        Arc::new(Self {
            scores: Mutex::new(scores.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl GoalValidator for ScriptedValidator {
    async fn validate(
        &self,
        goal: &Goal,
        _metrics: &ActualMetrics,
        session_id: &str,
    ) -> DomainResult<ConsumptionReport> {
        let score = self
            .scores
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| DomainError::ValidationFailed("score script exhausted".to_string()))?;
        let achieved = score >= goal.success_criteria.min_quality_score;
        Ok(ConsumptionReport::scored(goal.id, session_id, score, achieved))
    }
}

/// Validator that holds every call until the test releases it.
///
/// Lets a test line up overlapping iterations, or stop a loop while an
/// iteration is still validating.
pub struct GatedValidator {
    score: f64,
    entered: Semaphore,
    gate: Semaphore,
}

impl GatedValidator {
    pub fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            entered: Semaphore::new(0),
            gate: Semaphore::new(0),
        })
    }

    /// Wait until `n` calls are blocked inside `validate`.
    pub async fn wait_entered(&self, n: u32) {
        self.entered
            .acquire_many(n)
            .await
            .expect("entered semaphore closed")
            .forget();
    }

    /// Let `n` blocked calls finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl GoalValidator for GatedValidator {
    async fn validate(
        &self,
        goal: &Goal,
        _metrics: &ActualMetrics,
        session_id: &str,
    ) -> DomainResult<ConsumptionReport> {
        self.entered.add_permits(1);
        self.gate
            .acquire()
            .await
            .map_err(|e| DomainError::ValidationFailed(e.to_string()))?
            .forget();
        let achieved = self.score >= goal.success_criteria.min_quality_score;
        Ok(ConsumptionReport::scored(goal.id, session_id, self.score, achieved))
    }
}

/// Metrics whose content the scripted validator ignores.
pub fn any_metrics() -> ActualMetrics {
    ActualMetrics {
        quality_score: 70.0,
        test_coverage: 60.0,
        tests_passed: 10,
        ..ActualMetrics::default()
    }
}
