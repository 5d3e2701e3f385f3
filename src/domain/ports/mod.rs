//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces external collaborators must implement:
//! - SpecialistWorker / WorkerFactory: task executors
//! - GoalValidator: scores metrics against a goal
//! - ReportStore: keyed persistence of reports and snapshots
//! - EscalationNotifier: delivery of escalation records
//!
//! The orchestration core depends only on these contracts.

pub mod goal_validator;
pub mod notifier;
pub mod report_store;
pub mod worker;

pub use goal_validator::GoalValidator;
pub use notifier::EscalationNotifier;
pub use report_store::ReportStore;
pub use worker::{SpecialistWorker, WorkerFactory};
