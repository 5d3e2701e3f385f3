//! Specialist worker adapters.

pub mod simulated;

pub use simulated::{SimulatedResponse, SimulatedWorker};
