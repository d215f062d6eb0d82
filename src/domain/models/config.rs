use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::poll::PollPolicy;

/// Main configuration structure for dbconverge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Poll policies for the lifecycle operations
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// In-memory gateway used by the `simulate` command
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Where local resource records are persisted
    #[serde(default)]
    pub state: StateConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file output (daily, hourly, never)
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Timing of one kind of convergence wait, in config units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollPolicyConfig {
    /// Settle delay before the first probe
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Minimum spacing between probes
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Deadline for the whole wait
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_initial_delay_ms() -> u64 {
    30_000
}

const fn default_min_interval_ms() -> u64 {
    10_000
}

const fn default_timeout_secs() -> u64 {
    40 * 60
}

impl Default for PollPolicyConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollPolicyConfig {
    pub const fn to_policy(self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            min_interval: Duration::from_millis(self.min_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Poll policies per lifecycle operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LifecycleConfig {
    #[serde(default)]
    pub create: PollPolicyConfig,

    #[serde(default)]
    pub delete: PollPolicyConfig,
}

/// Behaviour of the simulated gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationConfig {
    /// Run waits on a virtual clock instead of sleeping for real
    #[serde(default = "default_true")]
    pub virtual_time: bool,

    /// Statuses reported by successive describes after create; the last one sticks
    #[serde(default = "default_create_statuses")]
    pub create_statuses: Vec<String>,

    /// Statuses reported after delete before the instance disappears
    #[serde(default = "default_delete_statuses")]
    pub delete_statuses: Vec<String>,
}

const fn default_true() -> bool {
    true
}

fn default_create_statuses() -> Vec<String> {
    vec![
        "creating".to_string(),
        "backing-up".to_string(),
        "available".to_string(),
    ]
}

fn default_delete_statuses() -> Vec<String> {
    vec!["deleting".to_string()]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            virtual_time: default_true(),
            create_statuses: default_create_statuses(),
            delete_statuses: default_delete_statuses(),
        }
    }
}

/// Local record persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StateConfig {
    /// JSON file holding the records
    #[serde(default = "default_state_path")]
    pub path: String,
}

fn default_state_path() -> String {
    ".dbconverge/state.json".to_string()
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}
