//! Worker registry and factory map.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::models::WorkerType;
use crate::domain::ports::{SpecialistWorker, WorkerFactory};

/// Static map from worker type to the factory producing it.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    factories: HashMap<WorkerType, Arc<dyn WorkerFactory>>,
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("types", &self.available_types())
            .finish()
    }
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a worker type, replacing any previous one.
    pub fn register<F>(mut self, worker_type: WorkerType, factory: F) -> Self
    where
        F: WorkerFactory + 'static,
    {
        self.factories.insert(worker_type, Arc::new(factory));
        self
    }

    /// Register an already constructed worker under its own type.
    pub fn register_worker(self, worker: Arc<dyn SpecialistWorker>) -> Self {
        let worker_type = worker.worker_type();
        self.register(worker_type, move || Arc::clone(&worker))
    }

    /// Registered worker types.
    pub fn available_types(&self) -> Vec<WorkerType> {
        let mut types: Vec<WorkerType> = self.factories.keys().copied().collect();
        types.sort_by_key(WorkerType::as_str);
        types
    }

    /// Create one instance per registered type.
    pub fn instantiate(&self) -> WorkerSet {
        let workers = self
            .factories
            .iter()
            .map(|(worker_type, factory)| (*worker_type, factory.create()))
            .collect::<HashMap<_, _>>();
        debug!(count = workers.len(), "workers instantiated");
        WorkerSet { workers }
    }
}

/// Instantiated workers, shared by every task of a run.
#[derive(Clone, Default)]
pub struct WorkerSet {
    workers: HashMap<WorkerType, Arc<dyn SpecialistWorker>>,
}

impl WorkerSet {
    /// Worker for a type, falling back to the code generation worker.
    pub fn resolve(&self, worker_type: WorkerType) -> Option<Arc<dyn SpecialistWorker>> {
        self.workers
            .get(&worker_type)
            .or_else(|| self.workers.get(&WorkerType::CodeGeneration))
            .cloned()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether no worker is registered.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
