//! Shepherd - dependency-aware task orchestration with convergence-driven feedback loops
//!
//! Shepherd turns a work item into dependent tasks, runs them level by level
//! on specialist workers, and iterates on quality goals until scores converge,
//! diverge, or run out of iterations.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): scheduler, graph builder, feedback loop engines
//! - **Adapters** (`adapters`): report stores, notifiers, simulated workers
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use shepherd::adapters::SimulatedWorker;
//! use shepherd::domain::models::{SchedulerConfig, WorkItem, WorkerType};
//! use shepherd::services::{OrchestrationScheduler, WorkerRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = WorkerRegistry::new()
//!         .register_worker(SimulatedWorker::new(WorkerType::CodeGeneration).shared());
//!     let scheduler = OrchestrationScheduler::new(SchedulerConfig::default(), &registry);
//!     let item = WorkItem::new(1, "Add export", "- [ ] Add writer\n- [ ] Add tests");
//!     let report = scheduler.coordinate(&item).await?;
//!     println!("{:.0}% complete", report.summary.success_rate);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, ConsumptionReport, DependencyGraph, ExecutionPlan, ExecutionReport, FeedbackLoop,
    Goal, LoopStatus, Task, TaskStatus, WorkItem, WorkerType,
};
pub use domain::ports::{EscalationNotifier, GoalValidator, ReportStore, SpecialistWorker};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    DependencyGraphBuilder, FeedbackLoopOrchestrator, OrchestrationScheduler, WorkerRegistry,
};
