//! Specialist worker port - interface for task executors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, WorkerOutcome, WorkerType};

/// Trait for specialist worker implementations.
///
/// A worker performs one category of task (code generation, review,
/// deployment, ...). The scheduler depends only on this contract; an `Err`
/// is captured as a failed task result and never aborts a run.
#[async_trait]
pub trait SpecialistWorker: Send + Sync {
    /// The capability this worker provides.
    fn worker_type(&self) -> WorkerType;

    /// Execute a task to completion.
    async fn execute(&self, task: &Task) -> DomainResult<WorkerOutcome>;
}

/// Factory for creating worker instances.
pub trait WorkerFactory: Send + Sync {
    /// Create a worker instance.
    fn create(&self) -> Arc<dyn SpecialistWorker>;
}

impl<F> WorkerFactory for F
where
    F: Fn() -> Arc<dyn SpecialistWorker> + Send + Sync,
{
    fn create(&self) -> Arc<dyn SpecialistWorker> {
        self()
    }
}
