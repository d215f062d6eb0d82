//! Simulate command: drive a full instance lifecycle against the in-memory provider.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::adapters::{FileRecordStore, ManualClock, SimulatedGateway, SimulationScript, TokioClock};
use crate::cli::output::{output, CommandOutput};
use crate::domain::error::LifecycleError;
use crate::domain::models::{
    Config, DbInstanceConfig, FinalSnapshot, InstanceStatus, Password, ResourceRecord, Tags,
};
use crate::domain::ports::{Clock, RecordStore};
use crate::services::{LifecycleController, LifecyclePolicies, RefreshOutcome};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Instance identifier
    pub identifier: String,

    /// Read the full instance definition from a YAML file instead of flags
    #[arg(long, conflicts_with_all = ["engine", "engine_version", "instance_class", "allocated_storage"])]
    pub definition: Option<PathBuf>,

    /// Database engine
    #[arg(long, default_value = "postgres")]
    pub engine: String,

    /// Engine version
    #[arg(long, default_value = "15.4")]
    pub engine_version: String,

    /// Instance class
    #[arg(long, default_value = "db.t3.micro")]
    pub instance_class: String,

    /// Allocated storage in GiB
    #[arg(long, default_value_t = 20)]
    pub allocated_storage: u32,

    /// Tags to reconcile after bring-up (KEY=VALUE, repeatable)
    #[arg(short, long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Name of the final snapshot to take on tear-down
    #[arg(long)]
    pub final_snapshot: Option<String>,

    /// Statuses reported after create, overriding the configured script
    #[arg(long, value_delimiter = ',')]
    pub create_statuses: Vec<String>,

    /// Leave the instance up instead of tearing it down
    #[arg(long)]
    pub keep: bool,

    /// Sleep for real instead of advancing a virtual clock
    #[arg(long)]
    pub real_time: bool,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[derive(Debug, Serialize)]
pub struct StepOutput {
    pub operation: String,
    pub success: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct SimulationOutput {
    pub identifier: String,
    pub steps: Vec<StepOutput>,
    pub final_status: Option<String>,
    pub endpoint: Option<String>,
    pub elapsed_virtual_secs: Option<u64>,
    pub gateway_calls: GatewayCalls,
}

#[derive(Debug, Serialize)]
pub struct GatewayCalls {
    pub create: usize,
    pub describe: usize,
    pub update_tags: usize,
    pub delete: usize,
}

impl CommandOutput for SimulationOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Simulated lifecycle for {}:\n", self.identifier)];
        lines.push(format!("{:<12} {:<8} {}", "STEP", "RESULT", "DETAIL"));
        lines.push("-".repeat(60));
        for step in &self.steps {
            lines.push(format!(
                "{:<12} {:<8} {}",
                step.operation,
                if step.success { "ok" } else { "failed" },
                step.detail
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            "Final status: {}",
            self.final_status.as_deref().unwrap_or("gone")
        ));
        if let Some(endpoint) = &self.endpoint {
            lines.push(format!("Endpoint: {endpoint}"));
        }
        if let Some(secs) = self.elapsed_virtual_secs {
            lines.push(format!("Virtual time elapsed: {secs}s"));
        }
        lines.push(format!(
            "Gateway calls: create={} describe={} update_tags={} delete={}",
            self.gateway_calls.create,
            self.gateway_calls.describe,
            self.gateway_calls.update_tags,
            self.gateway_calls.delete
        ));
        lines.join("\n")
    }
}

struct Run {
    steps: Vec<StepOutput>,
}

impl Run {
    fn record<T>(
        &mut self,
        operation: &str,
        result: &Result<T, LifecycleError>,
        ok: impl FnOnce(&T) -> String,
    ) {
        let (success, detail) = match result {
            Ok(value) => (true, ok(value)),
            Err(err) => (false, err.to_string()),
        };
        self.steps.push(StepOutput {
            operation: operation.to_string(),
            success,
            detail,
        });
    }
}

pub async fn execute(args: SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let definition = load_definition(&args).await?;
    let desired: Tags = args.tags.iter().cloned().collect();

    let mut script = SimulationScript::from(&config.simulation);
    if !args.create_statuses.is_empty() {
        script.create = args
            .create_statuses
            .iter()
            .map(|s| InstanceStatus::parse(s))
            .collect();
    }
    let gateway = Arc::new(SimulatedGateway::with_script(script));

    let manual = (config.simulation.virtual_time && !args.real_time)
        .then(|| Arc::new(ManualClock::new()));
    let clock: Arc<dyn Clock> = match &manual {
        Some(clock) => clock.clone(),
        None => Arc::new(TokioClock),
    };

    let controller = LifecycleController::new(gateway.clone(), clock)
        .with_policies(LifecyclePolicies::from(&config.lifecycle));
    let store = FileRecordStore::new(&config.state.path);
    let key = definition.identifier.to_string();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling wait");
            on_interrupt.cancel();
        }
    });

    let mut record = ResourceRecord::new();
    let mut run = Run { steps: Vec::new() };
    let outcome = drive(
        &controller,
        &store,
        &key,
        &mut record,
        &definition,
        &desired,
        &args,
        &cancel,
        &mut run,
    )
    .await;

    let snapshot = record.snapshot.as_ref();
    let out = SimulationOutput {
        identifier: key,
        steps: run.steps,
        final_status: record.last_status().map(|s| s.as_str().to_string()),
        endpoint: snapshot.and_then(|s| s.endpoint.as_ref()).map(ToString::to_string),
        elapsed_virtual_secs: manual.map(|clock| clock.elapsed().as_secs()),
        gateway_calls: GatewayCalls {
            create: gateway.create_calls(),
            describe: gateway.describe_calls(),
            update_tags: gateway.update_tags_calls(),
            delete: gateway.delete_calls(),
        },
    };
    output(&out, json_mode);

    outcome
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    controller: &LifecycleController<SimulatedGateway>,
    store: &FileRecordStore,
    key: &str,
    record: &mut ResourceRecord,
    definition: &DbInstanceConfig,
    desired: &Tags,
    args: &SimulateArgs,
    cancel: &CancellationToken,
    run: &mut Run,
) -> Result<()> {
    let result = controller.bring_up(record, definition, cancel).await;
    run.record("create", &result, |_| {
        let endpoint = record.snapshot.as_ref().and_then(|s| s.endpoint.as_ref());
        match endpoint {
            Some(endpoint) => format!("available at {endpoint}"),
            None => "available".to_string(),
        }
    });
    result?;
    store.save(key, record).await.context("Failed to save record")?;

    if !desired.is_empty() || !record.tags.is_empty() {
        let result = controller.reconcile_tags(record, desired).await;
        run.record("update-tags", &result, |diff| {
            format!("{} set, {} removed", diff.set.len(), diff.remove.len())
        });
        store.save(key, record).await.context("Failed to save record")?;
        result?;
    }

    let result = controller.refresh(record).await;
    run.record("refresh", &result, |outcome| match outcome {
        RefreshOutcome::Updated(status) => format!("status {status}"),
        RefreshOutcome::Gone => "instance no longer exists".to_string(),
        RefreshOutcome::Untracked => "nothing to refresh".to_string(),
    });
    result?;
    store.save(key, record).await.context("Failed to save record")?;

    if args.keep {
        return Ok(());
    }

    let final_snapshot = FinalSnapshot::from_name(args.final_snapshot.as_deref());
    let result = controller.tear_down(record, &final_snapshot, cancel).await;
    run.record("delete", &result, |_| match final_snapshot.name() {
        Some(name) => format!("destroyed, final snapshot '{name}'"),
        None => "destroyed".to_string(),
    });
    result?;
    store.remove(key).await.context("Failed to remove record")?;

    Ok(())
}

async fn load_definition(args: &SimulateArgs) -> Result<DbInstanceConfig> {
    let Some(path) = &args.definition else {
        return Ok(DbInstanceConfig::new(
            args.identifier.as_str(),
            args.engine.as_str(),
            args.engine_version.as_str(),
            args.instance_class.as_str(),
            args.allocated_storage,
            "admin",
            Password::new("simulated"),
        ));
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut definition: DbInstanceConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Invalid instance definition in {}", path.display()))?;
    definition.identifier = args.identifier.as_str().into();
    Ok(definition)
}
