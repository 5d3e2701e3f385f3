//! Layered configuration loading and validation.

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project configuration file, created by the operator.
pub const PROJECT_CONFIG_PATH: &str = ".shepherd/config.yaml";

/// Optional local overrides, usually not committed.
pub const LOCAL_CONFIG_PATH: &str = ".shepherd/local.yaml";

/// Prefix for environment overrides; nesting uses `__`.
pub const ENV_PREFIX: &str = "SHEPHERD_";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const VALID_ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `scheduler.max_concurrency` is zero
    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidMaxConcurrency(usize),

    /// `feedback_loop.max_iterations` is zero
    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    /// `feedback_loop.convergence_threshold` is not positive
    #[error("Invalid convergence_threshold: {0}. Must be positive")]
    InvalidConvergenceThreshold(f64),

    /// Unknown `logging.level`
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// `persistence.reports_dir` is empty
    #[error("Reports directory cannot be empty")]
    EmptyReportsDir,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `.shepherd/config.yaml`
    /// 3. `.shepherd/local.yaml`
    /// 4. Environment variables (`SHEPHERD_*`, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(PROJECT_CONFIG_PATH))
            .merge(Yaml::file(LOCAL_CONFIG_PATH))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.scheduler.max_concurrency == 0 {
            return Err(ConfigError::InvalidMaxConcurrency(
                config.scheduler.max_concurrency,
            ));
        }

        let feedback = &config.feedback_loop;
        if feedback.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(feedback.max_iterations));
        }
        if feedback.convergence_threshold.is_nan() || feedback.convergence_threshold <= 0.0 {
            return Err(ConfigError::InvalidConvergenceThreshold(
                feedback.convergence_threshold,
            ));
        }

        if config.persistence.reports_dir.trim().is_empty() {
            return Err(ConfigError::EmptyReportsDir);
        }

        let logging = &config.logging;
        if !VALID_LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !VALID_LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        if !VALID_ROTATIONS.contains(&logging.rotation.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidRotation(logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::DependencyFailurePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    /// Runs `f` with the variables other tests set cleared, under temp-env's lock.
    fn without_overrides<R>(f: impl FnOnce() -> R) -> R {
        temp_env::with_vars_unset(
            [
                "SHEPHERD_FEEDBACK_LOOP__MAX_ITERATIONS",
                "SHEPHERD_SCHEDULER__MAX_CONCURRENCY",
            ],
            f,
        )
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.persistence.reports_dir, ".shepherd/reports");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let file = yaml_file(
            "scheduler:\n  max_concurrency: 2\n  dependency_failure_policy: propagate_skip\nlogging:\n  level: debug\n",
        );

        let config = without_overrides(|| ConfigLoader::load_from_file(file.path()).unwrap());

        assert_eq!(config.scheduler.max_concurrency, 2);
        assert_eq!(
            config.scheduler.dependency_failure_policy,
            DependencyFailurePolicy::PropagateSkip
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty", "unset fields keep defaults");
        assert_eq!(config.feedback_loop.max_iterations, 10);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("feedback_loop:\n  max_iterations: 4\n");

        temp_env::with_vars(
            [
                ("SHEPHERD_FEEDBACK_LOOP__MAX_ITERATIONS", Some("7")),
                ("SHEPHERD_SCHEDULER__MAX_CONCURRENCY", Some("3")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.feedback_loop.max_iterations, 7);
                assert_eq!(config.scheduler.max_concurrency, 3);
            },
        );
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        let file = yaml_file("scheduler:\n  max_concurrency: 0\n");
        let err = without_overrides(|| ConfigLoader::load_from_file(file.path()).unwrap_err());
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.scheduler.max_concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrency(0))
        ));
    }

    #[test]
    fn test_validate_zero_iterations() {
        let mut config = Config::default();
        config.feedback_loop.max_iterations = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxIterations(0))
        ));
    }

    #[test]
    fn test_validate_non_positive_threshold() {
        let mut config = Config::default();
        config.feedback_loop.convergence_threshold = 0.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConvergenceThreshold(_))
        ));
    }

    #[test]
    fn test_validate_logging_fields() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_empty_reports_dir() {
        let mut config = Config::default();
        config.persistence.reports_dir = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyReportsDir)
        ));
    }
}
