//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces that adapters implement:
//! - ResourceGateway: provider create/describe/update-tags/delete calls
//! - Clock: time source for convergence waits
//! - RecordStore: persistence for local resource records
//!
//! These traits keep the poller and lifecycle controller independent of
//! any specific provider or storage.

pub mod clock;
pub mod record_store;
pub mod resource_gateway;

pub use clock::Clock;
pub use record_store::RecordStore;
pub use resource_gateway::{probe, ResourceGateway};
