use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::{Config, PollPolicyConfig};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("State path cannot be empty")]
    EmptyStatePath,

    #[error("Invalid {0} policy: timeout_secs cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Invalid {0} policy: min_interval_ms cannot be 0")]
    ZeroInterval(&'static str),

    #[error(
        "Invalid {operation} policy: initial_delay_ms ({initial_delay_ms}) must be less than the timeout ({timeout_secs}s)"
    )]
    DelayExceedsTimeout {
        operation: &'static str,
        initial_delay_ms: u64,
        timeout_secs: u64,
    },

    #[error("Simulation create_statuses cannot be empty")]
    EmptyCreateScript,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .dbconverge/config.yaml (project config)
    /// 3. .dbconverge/local.yaml (local overrides, optional)
    /// 4. Environment variables (DBCONVERGE_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(".dbconverge/config.yaml"))
            .merge(Yaml::file(".dbconverge/local.yaml"))
            .merge(Env::prefixed("DBCONVERGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("DBCONVERGE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.state.path.trim().is_empty() {
            return Err(ConfigError::EmptyStatePath);
        }

        Self::validate_policy("create", &config.lifecycle.create)?;
        Self::validate_policy("delete", &config.lifecycle.delete)?;

        if config.simulation.create_statuses.is_empty() {
            return Err(ConfigError::EmptyCreateScript);
        }

        Ok(())
    }

    fn validate_policy(operation: &'static str, policy: &PollPolicyConfig) -> Result<(), ConfigError> {
        if policy.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout(operation));
        }
        if policy.initial_delay_ms >= policy.timeout_secs.saturating_mul(1000) {
            return Err(ConfigError::DelayExceedsTimeout {
                operation,
                initial_delay_ms: policy.initial_delay_ms,
                timeout_secs: policy.timeout_secs,
            });
        }
        if policy.min_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval(operation));
        }
        Ok(())
    }
}
