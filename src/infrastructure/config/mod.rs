//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Validation of poll policies and logging settings

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
