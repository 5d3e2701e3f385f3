//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output on stderr
//! - Optional rolling JSON log files via tracing-appender
//! - `RUST_LOG` overrides the configured level

pub mod config;
pub mod logger;

pub use config::{LogFormat, LogSettings, RotationPolicy};
pub use logger::LoggerImpl;
