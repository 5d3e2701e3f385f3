//! Domain models.

pub mod config;
pub mod escalation;
pub mod execution;
pub mod feedback;
pub mod goal;
pub mod graph;
pub mod task;

pub use config::{
    Config, DependencyFailurePolicy, FeedbackLoopConfig, LoggingConfig, PersistenceConfig,
    SchedulerConfig,
};
pub use escalation::{Escalation, EscalationTarget};
pub use execution::{
    ExecutionPlan, ExecutionReport, ExecutionSummary, OutcomeStatus, ProgressSnapshot, TaskResult,
    WorkerMetrics, WorkerOutcome,
};
pub use feedback::{
    ActualMetrics, ConsumptionReport, ConvergenceMetrics, FeedbackLoop, FeedbackRecord,
    FeedbackType, GapSeverity, IterationRecord, LoopStatus, MetricGap, ValidationResult,
};
pub use goal::{
    Goal, GoalBuilder, GoalPriority, GoalRefinement, RefinementChange, SuccessCriteria, TestSpec,
};
pub use graph::{CriticalPath, DependencyGraph, GraphEdge, TaskDecomposition};
pub use task::{
    ImpactLevel, Severity, Task, TaskStatus, TaskType, WorkItem, WorkerType, total_duration,
};
