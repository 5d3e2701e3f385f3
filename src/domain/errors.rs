//! Domain errors for the Shepherd orchestration core.

use thiserror::Error;
use uuid::Uuid;

use super::models::LoopStatus;

/// Format a cycle path as a human-readable string: `A -> B -> C`.
fn format_cycle_path(path: &[String]) -> String {
    path.join(" -> ")
}

/// Domain-level errors that can occur in the orchestration core.
///
/// Per-task worker failures never surface here during a scheduler run; they
/// are captured as failed `TaskResult`s inside the execution report.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No goal with this id in the store
    #[error("Goal not found: {0}")]
    GoalNotFound(Uuid),

    /// No feedback loop with this id
    #[error("Feedback loop not found: {0}")]
    LoopNotFound(Uuid),

    /// Iteration attempted on a loop that no longer accepts one
    #[error("Illegal transition for loop {loop_id}: cannot iterate a loop in status {status}")]
    IllegalLoopTransition {
        /// Loop the call targeted
        loop_id: Uuid,
        /// Status the loop was in
        status: LoopStatus,
    },

    /// Tasks depend on each other in a cycle
    #[error("Task dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<String>),

    /// Input or state failed a check
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A specialist worker returned an error
    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    /// Report store I/O failed
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::PersistenceFailed(err.to_string())
    }
}
