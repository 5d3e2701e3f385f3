//! Adapters implementing the domain ports.

pub mod notifiers;
pub mod storage;
pub mod workers;

pub use notifiers::{RecordingNotifier, TracingNotifier};
pub use storage::{FileReportStore, InMemoryReportStore};
pub use workers::{SimulatedResponse, SimulatedWorker};
