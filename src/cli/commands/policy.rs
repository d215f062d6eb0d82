//! Policy command: print the effective convergence policies.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::{SimulatedGateway, TokioClock};
use crate::cli::output::{format_duration, output, CommandOutput};
use crate::domain::models::{Config, PollSpec};
use crate::services::{LifecycleController, LifecyclePolicies};

#[derive(Debug, Serialize)]
pub struct PolicyOutput {
    pub operation: &'static str,
    pub target: String,
    pub pending: Vec<String>,
    pub initial_delay_ms: u128,
    pub min_interval_ms: u128,
    pub timeout_secs: u64,
}

impl PolicyOutput {
    fn new(operation: &'static str, spec: &PollSpec) -> Self {
        Self {
            operation,
            target: spec.target().to_string(),
            pending: spec.pending().iter().map(|s| s.as_str().to_string()).collect(),
            initial_delay_ms: spec.initial_delay().as_millis(),
            min_interval_ms: spec.min_interval().as_millis(),
            timeout_secs: spec.timeout().as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PolicyListOutput {
    pub policies: Vec<PolicyOutput>,
}

impl CommandOutput for PolicyListOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{:<8} {:<10} {:<8} {:<9} {:<8} {}",
            "OP", "TARGET", "DELAY", "INTERVAL", "TIMEOUT", "PENDING"
        )];
        lines.push("-".repeat(80));
        for policy in &self.policies {
            lines.push(format!(
                "{:<8} {:<10} {:<8} {:<9} {:<8} {}",
                policy.operation,
                policy.target,
                format_duration(std::time::Duration::from_millis(
                    u64::try_from(policy.initial_delay_ms).unwrap_or(u64::MAX)
                )),
                format_duration(std::time::Duration::from_millis(
                    u64::try_from(policy.min_interval_ms).unwrap_or(u64::MAX)
                )),
                format!("{}s", policy.timeout_secs),
                policy.pending.join(", ")
            ));
        }
        lines.join("\n")
    }
}

/// Build the create and delete specs exactly as a lifecycle run would.
pub fn collect(config: &Config) -> Result<PolicyListOutput> {
    let controller = LifecycleController::new(Arc::new(SimulatedGateway::new()), Arc::new(TokioClock))
        .with_policies(LifecyclePolicies::from(&config.lifecycle));

    Ok(PolicyListOutput {
        policies: vec![
            PolicyOutput::new("create", &controller.creation_spec()?),
            PolicyOutput::new("delete", &controller.deletion_spec()?),
        ],
    })
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    output(&collect(config)?, json_mode);
    Ok(())
}
