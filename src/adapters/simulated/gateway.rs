//! In-memory resource gateway with scripted status transitions.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::error::GatewayError;
use crate::domain::models::{
    DbInstanceConfig, Endpoint, FinalSnapshot, InstanceSnapshot, InstanceStatus, ResourceId,
    SimulationConfig, TagDiff, Tags,
};
use crate::domain::ports::ResourceGateway;

/// Status sequences the simulated provider walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationScript {
    /// Reported by successive describes after create; the last entry sticks.
    pub create: Vec<InstanceStatus>,
    /// Reported by successive describes after delete; then the instance is gone.
    pub delete: Vec<InstanceStatus>,
}

impl Default for SimulationScript {
    fn default() -> Self {
        Self {
            create: vec![
                InstanceStatus::Creating,
                InstanceStatus::BackingUp,
                InstanceStatus::Available,
            ],
            delete: vec![InstanceStatus::Deleting],
        }
    }
}

impl From<&SimulationConfig> for SimulationScript {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            create: config
                .create_statuses
                .iter()
                .map(|s| InstanceStatus::parse(s))
                .collect(),
            delete: config
                .delete_statuses
                .iter()
                .map(|s| InstanceStatus::parse(s))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Provisioning { step: usize },
    Deleting { step: usize },
}

#[derive(Debug, Clone)]
struct SimulatedInstance {
    config: DbInstanceConfig,
    phase: Phase,
    forced_status: Option<InstanceStatus>,
    tags: Tags,
}

#[derive(Debug, Default)]
struct Faults {
    describe: VecDeque<GatewayError>,
    mutation: VecDeque<GatewayError>,
}

#[derive(Debug, Default)]
struct CallCounters {
    create: AtomicUsize,
    describe: AtomicUsize,
    update_tags: AtomicUsize,
    delete: AtomicUsize,
}

/// Gateway that keeps instances in memory.
///
/// Each `describe` of a provisioning instance advances it one step through
/// the create script; each `describe` of a deleting instance advances it
/// through the delete script and then removes it.
#[derive(Debug)]
pub struct SimulatedGateway {
    script: SimulationScript,
    instances: RwLock<HashMap<ResourceId, SimulatedInstance>>,
    final_snapshots: RwLock<Vec<String>>,
    faults: Mutex<Faults>,
    calls: CallCounters,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::with_script(SimulationScript::default())
    }

    pub fn with_script(script: SimulationScript) -> Self {
        Self {
            script,
            instances: RwLock::new(HashMap::new()),
            final_snapshots: RwLock::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            calls: CallCounters::default(),
        }
    }

    /// Make the next `describe` fail with `error`. Queued failures are used in order.
    pub async fn fail_next_describe(&self, error: GatewayError) {
        self.faults.lock().await.describe.push_back(error);
    }

    /// Make the next create, update-tags, or delete call fail with `error`.
    pub async fn fail_next_mutation(&self, error: GatewayError) {
        self.faults.lock().await.mutation.push_back(error);
    }

    /// Pin an instance to a status regardless of its script.
    pub async fn force_status(&self, id: &ResourceId, status: InstanceStatus) {
        if let Some(instance) = self.instances.write().await.get_mut(id) {
            instance.forced_status = Some(status);
        }
    }

    /// Insert an instance that is already available.
    pub async fn seed_available(&self, config: DbInstanceConfig) {
        let id = config.identifier.clone();
        let instance = SimulatedInstance {
            tags: config.tags.clone(),
            config,
            phase: Phase::Provisioning { step: usize::MAX },
            forced_status: Some(InstanceStatus::Available),
        };
        self.instances.write().await.insert(id, instance);
    }

    pub async fn contains(&self, id: &ResourceId) -> bool {
        self.instances.read().await.contains_key(id)
    }

    pub async fn final_snapshots(&self) -> Vec<String> {
        self.final_snapshots.read().await.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.calls.describe.load(Ordering::SeqCst)
    }

    pub fn update_tags_calls(&self) -> usize {
        self.calls.update_tags.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    async fn take_mutation_fault(&self) -> Result<(), GatewayError> {
        match self.faults.lock().await.mutation.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn script_status(script: &[InstanceStatus], step: usize) -> InstanceStatus {
        script
            .get(step)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or(InstanceStatus::Available)
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn default_port(engine: &str) -> u16 {
    if engine.starts_with("postgres") {
        5432
    } else if engine.starts_with("sqlserver") {
        1433
    } else if engine.starts_with("oracle") {
        1521
    } else {
        3306
    }
}

fn snapshot_of(
    id: &ResourceId,
    instance: &SimulatedInstance,
    status: InstanceStatus,
) -> InstanceSnapshot {
    let config = &instance.config;
    let reachable = match instance.phase {
        Phase::Provisioning { .. } => status == InstanceStatus::Available,
        Phase::Deleting { .. } => true,
    };

    InstanceSnapshot {
        identifier: id.clone(),
        status,
        engine: config.engine.clone(),
        engine_version: config.engine_version.clone(),
        instance_class: config.instance_class.clone(),
        allocated_storage: config.allocated_storage,
        username: config.username.clone(),
        name: config.name.clone(),
        storage_type: Some(config.storage_type.clone().unwrap_or_else(|| "gp2".to_string())),
        storage_encrypted: config.storage_encrypted,
        availability_zone: Some(
            config
                .availability_zone
                .clone()
                .unwrap_or_else(|| "sim-1a".to_string()),
        ),
        backup_retention_period: config.backup_retention_period,
        backup_window: Some(
            config
                .backup_window
                .clone()
                .unwrap_or_else(|| "03:00-03:30".to_string()),
        ),
        maintenance_window: Some(
            config
                .maintenance_window
                .clone()
                .unwrap_or_else(|| "sun:05:00-sun:05:30".to_string()),
        ),
        multi_az: config.multi_az.unwrap_or(false),
        db_subnet_group_name: config.db_subnet_group_name.clone(),
        parameter_group_name: Some(
            config
                .parameter_group_name
                .clone()
                .unwrap_or_else(|| format!("default.{}", config.engine)),
        ),
        endpoint: reachable.then(|| Endpoint {
            address: format!("{id}.sim.internal"),
            port: config.port.unwrap_or_else(|| default_port(&config.engine)),
        }),
        vpc_security_group_ids: config.vpc_security_group_ids.clone(),
        security_group_names: config.security_group_names.clone(),
        tags: instance.tags.clone(),
    }
}

#[async_trait]
impl ResourceGateway for SimulatedGateway {
    async fn create(&self, config: &DbInstanceConfig) -> Result<ResourceId, GatewayError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.take_mutation_fault().await?;

        if config.allocated_storage == 0 {
            return Err(GatewayError::InvalidRequest(
                "allocated_storage must be greater than 0".to_string(),
            ));
        }

        let id = config.identifier.clone();
        let mut instances = self.instances.write().await;
        if instances.contains_key(&id) {
            return Err(GatewayError::Api {
                code: "DBInstanceAlreadyExists".to_string(),
                message: format!("instance {id} already exists"),
            });
        }

        debug!(identifier = %id, engine = %config.engine, "simulated create accepted");
        instances.insert(
            id.clone(),
            SimulatedInstance {
                config: config.clone(),
                phase: Phase::Provisioning { step: 0 },
                forced_status: None,
                tags: config.tags.clone(),
            },
        );
        Ok(id)
    }

    async fn describe(&self, id: &ResourceId) -> Result<Option<InstanceSnapshot>, GatewayError> {
        self.calls.describe.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.faults.lock().await.describe.pop_front() {
            return Err(error);
        }

        let mut instances = self.instances.write().await;
        let Some(instance) = instances.get_mut(id) else {
            return Ok(None);
        };

        let status = match instance.phase {
            Phase::Provisioning { step } => {
                instance.phase = Phase::Provisioning {
                    step: step.saturating_add(1),
                };
                Self::script_status(&self.script.create, step)
            }
            Phase::Deleting { step } => {
                if step >= self.script.delete.len() {
                    instances.remove(id);
                    debug!(identifier = %id, "simulated instance removed");
                    return Ok(None);
                }
                instance.phase = Phase::Deleting { step: step + 1 };
                self.script.delete[step].clone()
            }
        };
        let status = instance.forced_status.clone().unwrap_or(status);

        Ok(Some(snapshot_of(id, instance, status)))
    }

    async fn update_tags(&self, id: &ResourceId, diff: &TagDiff) -> Result<(), GatewayError> {
        self.calls.update_tags.fetch_add(1, Ordering::SeqCst);
        self.take_mutation_fault().await?;

        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
        diff.apply(&mut instance.tags);
        debug!(
            identifier = %id,
            set = diff.set.len(),
            removed = diff.remove.len(),
            "simulated tags updated"
        );
        Ok(())
    }

    async fn delete(
        &self,
        id: &ResourceId,
        final_snapshot: &FinalSnapshot,
    ) -> Result<(), GatewayError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.take_mutation_fault().await?;

        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
        if matches!(instance.phase, Phase::Deleting { .. }) {
            return Err(GatewayError::Api {
                code: "InvalidDBInstanceState".to_string(),
                message: format!("instance {id} is already being deleted"),
            });
        }

        instance.phase = Phase::Deleting { step: 0 };
        instance.forced_status = None;
        if let Some(name) = final_snapshot.name() {
            self.final_snapshots.write().await.push(name.to_string());
        }
        debug!(identifier = %id, final_snapshot = ?final_snapshot.name(), "simulated delete accepted");
        Ok(())
    }
}
