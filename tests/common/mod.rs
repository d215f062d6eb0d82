//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dbconverge::adapters::{ManualClock, SimulatedGateway, SimulationScript, TokioClock};
use dbconverge::domain::models::{
    DbInstanceConfig, InstanceStatus, Password, PollPolicy, ResourceId, ResourceRecord, Tags,
};
use dbconverge::services::{LifecycleController, LifecyclePolicies};
use dbconverge::ResourceGateway;

pub type Controller = LifecycleController<SimulatedGateway>;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Minimal postgres definition with the given identifier
pub fn instance_config(identifier: &str) -> DbInstanceConfig {
    DbInstanceConfig::new(
        identifier,
        "postgres",
        "15.4",
        "db.t3.micro",
        20,
        "admin",
        Password::new("correct-horse"),
    )
}

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn statuses(labels: &[&str]) -> Vec<InstanceStatus> {
    labels.iter().map(|l| InstanceStatus::parse(l)).collect()
}

/// 30s settle delay, 10s interval, and the given deadline
pub fn policy_with_timeout(timeout: Duration) -> PollPolicy {
    PollPolicy {
        timeout,
        ..PollPolicy::provisioning()
    }
}

/// Controller on a virtual clock over a simulated gateway
pub struct Harness {
    pub gateway: Arc<SimulatedGateway>,
    pub clock: Arc<ManualClock>,
    pub controller: Controller,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_script(SimulationScript::default())
    }

    pub fn with_script(script: SimulationScript) -> Self {
        let gateway = Arc::new(SimulatedGateway::with_script(script));
        let clock = Arc::new(ManualClock::new());
        let controller = LifecycleController::new(gateway.clone(), clock.clone());
        Self {
            gateway,
            clock,
            controller,
        }
    }

    pub fn with_policies(mut self, policies: LifecyclePolicies) -> Self {
        self.controller = self.controller.with_policies(policies);
        self
    }

    /// Seed an available instance and return a record tracking it.
    pub async fn provisioned(&self, identifier: &str) -> ResourceRecord {
        self.gateway.seed_available(instance_config(identifier)).await;
        let id = ResourceId::new(identifier);
        let snapshot = self
            .gateway
            .describe(&id)
            .await
            .expect("describe seeded instance")
            .expect("seeded instance exists");

        let mut record = ResourceRecord::new();
        record.adopt(id, snapshot);
        record
    }
}

/// Controller on tokio's timer, for tests running with a paused runtime
pub fn wall_clock_controller(gateway: Arc<SimulatedGateway>) -> Controller {
    LifecycleController::new(gateway, Arc::new(TokioClock))
}
