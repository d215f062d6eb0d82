//! Domain layer for dbconverge
//!
//! This module contains the instance model, poll specifications, error
//! taxonomy, and the port traits adapters implement.

pub mod error;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{
    ErrorKind, GatewayError, LifecycleError, Operation, PollFailure, PollSpecError, StoreError,
};
