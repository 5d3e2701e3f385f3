//! Logging settings parsed from configuration.

use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::Level;

use crate::domain::models::config::LoggingConfig;

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Human readable, multi-line
    Pretty,
}

/// How often log files roll over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file
    Never,
}

/// Parsed form of [`LoggingConfig`].
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Maximum level emitted unless `RUST_LOG` overrides it
    pub level: Level,
    /// Console format
    pub format: LogFormat,
    /// Directory for rolling JSON log files; console only when unset
    pub log_dir: Option<PathBuf>,
    /// File rotation policy
    pub rotation: RotationPolicy,
}

impl LogSettings {
    /// Parse and check the configured logging values.
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        Ok(Self {
            level: parse_log_level(&config.level)?,
            format: parse_format(&config.format)?,
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            rotation: parse_rotation(&config.rotation)?,
        })
    }

    /// Same settings with the level raised to debug.
    pub fn verbose(mut self) -> Self {
        if self.level < Level::DEBUG {
            self.level = Level::DEBUG;
        }
        self
    }
}

/// Parse log level string to Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!("Invalid log level: {level}"),
    }
}

fn parse_format(format: &str) -> Result<LogFormat> {
    match format.to_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        _ => bail!("Invalid log format: {format}"),
    }
}

fn parse_rotation(rotation: &str) -> Result<RotationPolicy> {
    match rotation.to_lowercase().as_str() {
        "daily" => Ok(RotationPolicy::Daily),
        "hourly" => Ok(RotationPolicy::Hourly),
        "never" => Ok(RotationPolicy::Never),
        _ => bail!("Invalid log rotation: {rotation}"),
    }
}
