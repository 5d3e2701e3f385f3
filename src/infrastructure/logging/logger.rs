//! Tracing subscriber setup.

use std::io;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::config::{LogFormat, LogSettings, RotationPolicy};

const LOG_FILE_NAME: &str = "shepherd.log";

/// Logger implementation using tracing
///
/// Holds the appender guard; dropping it flushes pending file writes.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber.
    ///
    /// Console output goes to stderr so command output on stdout stays
    /// parseable. File output, when a directory is set, is always JSON.
    ///
    /// # Errors
    /// Returns an error if a global subscriber is already installed.
    pub fn init(settings: &LogSettings) -> Result<Self> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(settings.level.into())
            .from_env_lossy();

        let (file_layer, guard) = match settings.log_dir {
            Some(ref log_dir) => {
                let appender = match settings.rotation {
                    RotationPolicy::Daily => rolling::daily(log_dir, LOG_FILE_NAME),
                    RotationPolicy::Hourly => rolling::hourly(log_dir, LOG_FILE_NAME),
                    RotationPolicy::Never => rolling::never(log_dir, LOG_FILE_NAME),
                };
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_thread_ids(true);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let json_layer = (settings.format == LogFormat::Json).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_target(true)
        });

        let pretty_layer = (settings.format == LogFormat::Pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(json_layer)
            .with(pretty_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(
            level = %settings.level,
            format = ?settings.format,
            file_output = settings.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }

    /// Whether log lines are also written to a file.
    pub fn has_file_output(&self) -> bool {
        self._guard.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    // Only one test may install the global subscriber per test binary.
    #[test]
    fn test_init_with_file_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = LogSettings {
            level: Level::INFO,
            format: LogFormat::Json,
            log_dir: Some(dir.path().to_path_buf()),
            rotation: RotationPolicy::Never,
        };

        let logger = LoggerImpl::init(&settings).unwrap();
        assert!(logger.has_file_output());

        assert!(LoggerImpl::init(&settings).is_err(), "second install must fail");
    }
}
