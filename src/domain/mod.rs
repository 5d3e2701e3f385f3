//! Domain layer for the Shepherd orchestration core
//!
//! This module contains core business logic, domain models and ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
