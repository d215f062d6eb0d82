//! dbconverge - lifecycle management for asynchronously provisioned database instances
//!
//! Provider APIs accept a create or delete request immediately and then
//! move the instance through intermediate statuses on their own schedule.
//! This crate waits for those transitions to finish with a bounded,
//! cancellable polling engine and builds bring-up, tag reconciliation,
//! refresh, and tear-down on top of it.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors, and the port traits
//! - **Service Layer** (`services`): Convergence poller and lifecycle controller
//! - **Adapters** (`adapters`): Clocks, the simulated provider, file-backed records
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dbconverge::{DbInstanceConfig, LifecycleController, Password, ResourceRecord};
//! use dbconverge::adapters::{SimulatedGateway, TokioClock};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let controller = LifecycleController::new(
//!         Arc::new(SimulatedGateway::new()),
//!         Arc::new(TokioClock),
//!     );
//!     let config = DbInstanceConfig::new(
//!         "orders-db", "postgres", "15.4", "db.t3.micro", 20, "admin",
//!         Password::new("secret"),
//!     );
//!
//!     let mut record = ResourceRecord::new();
//!     controller
//!         .bring_up(&mut record, &config, &CancellationToken::new())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{ErrorKind, GatewayError, LifecycleError, PollFailure, PollSpecError};
pub use domain::models::{
    Config, DbInstanceConfig, FinalSnapshot, InstanceSnapshot, InstanceStatus, Password,
    PollOutcome, PollPolicy, PollSpec, ProbeResult, ResourceId, ResourceRecord, TagDiff, Tags,
    TargetState,
};
pub use domain::ports::{Clock, RecordStore, ResourceGateway};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergencePoller, LifecycleController, RefreshOutcome};
