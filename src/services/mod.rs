//! Application services: decomposition, graph leveling, scheduling and the
//! feedback loop.

pub mod convergence_engine;
pub mod decomposer;
pub mod dependency_graph;
pub mod escalation_policy;
pub mod feedback_loop;
pub mod goal_refinement;
pub mod goal_store;
pub mod plan_document;
pub mod scheduler;
pub mod threshold_validator;
pub mod worker_registry;

pub use convergence_engine::ConvergenceEngine;
pub use decomposer::Decomposer;
pub use dependency_graph::DependencyGraphBuilder;
pub use feedback_loop::{generate_feedback, FeedbackLoopOrchestrator};
pub use goal_refinement::GoalRefinementEngine;
pub use goal_store::GoalStore;
pub use plan_document::{Decision, PlanDocument, PlanLevel, PlanProgress, Timeline};
pub use scheduler::{ExecutionEvent, OrchestrationScheduler};
pub use threshold_validator::ThresholdValidator;
pub use worker_registry::{WorkerRegistry, WorkerSet};
