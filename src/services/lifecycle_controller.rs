//! Lifecycle orchestration for database instances.
//!
//! Each mutating operation issues one gateway call and, where the provider
//! transition is asynchronous, hands a probe bound to the instance to the
//! [`ConvergencePoller`]. The local record is only written once the
//! operation has reached its end state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{LifecycleError, Operation, PollFailure, PollSpecError};
use crate::domain::models::{
    DbInstanceConfig, FinalSnapshot, InstanceSnapshot, InstanceStatus, LifecycleConfig,
    PollOutcome, PollPolicy, PollSpec, ResourceId, ResourceRecord, TagDiff, Tags, TargetState,
};
use crate::domain::ports::{probe, Clock, ResourceGateway};
use crate::services::convergence_poller::ConvergencePoller;
use crate::services::in_flight::{InFlightGuard, InFlightRegistry};

/// Statuses that mean a create is still in progress.
pub const CREATE_PENDING: [InstanceStatus; 3] = [
    InstanceStatus::Creating,
    InstanceStatus::BackingUp,
    InstanceStatus::Modifying,
];

/// Statuses that mean a delete is still in progress.
pub const DELETE_PENDING: [InstanceStatus; 5] = [
    InstanceStatus::Creating,
    InstanceStatus::BackingUp,
    InstanceStatus::Modifying,
    InstanceStatus::Deleting,
    InstanceStatus::Available,
];

/// Timing for the create and delete waits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePolicies {
    pub create: PollPolicy,
    pub delete: PollPolicy,
}

impl From<&LifecycleConfig> for LifecyclePolicies {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            create: config.create.to_policy(),
            delete: config.delete.to_policy(),
        }
    }
}

/// Result of re-reading an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The instance exists; the record now holds this status.
    Updated(InstanceStatus),
    /// The provider no longer knows the instance; the record was cleared.
    Gone,
    /// The record had no identifier to refresh.
    Untracked,
}

/// Orchestrates bring-up, tag reconciliation, refresh, and tear-down.
///
/// Operations on distinct identifiers may run concurrently through one
/// controller. A second mutating operation on an identifier that already
/// has one in flight is rejected with
/// [`LifecycleError::OperationInProgress`].
pub struct LifecycleController<G: ResourceGateway + ?Sized> {
    gateway: Arc<G>,
    poller: ConvergencePoller,
    policies: LifecyclePolicies,
    in_flight: InFlightRegistry,
}

impl<G: ResourceGateway + ?Sized> LifecycleController<G> {
    /// Controller with the default 30s / 10s / 40min policies.
    pub fn new(gateway: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            poller: ConvergencePoller::new(clock),
            policies: LifecyclePolicies::default(),
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn with_policies(mut self, policies: LifecyclePolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn policies(&self) -> LifecyclePolicies {
        self.policies
    }

    /// Spec for waiting on a freshly created instance.
    pub fn creation_spec(&self) -> Result<PollSpec, PollSpecError> {
        PollSpec::builder(TargetState::Status(InstanceStatus::Available))
            .pending(CREATE_PENDING)
            .policy(self.policies.create)
            .build()
    }

    /// Spec for waiting on an instance being deleted.
    pub fn deletion_spec(&self) -> Result<PollSpec, PollSpecError> {
        PollSpec::builder(TargetState::Gone)
            .pending(DELETE_PENDING)
            .policy(self.policies.delete)
            .build()
    }

    /// Create an instance and wait until it is available.
    ///
    /// Both the requested identifier and the one the provider assigns are
    /// held in flight until the wait ends. On success the record holds the identifier and a snapshot read
    /// after convergence. On any failure the record is left untouched; the
    /// error carries the identifier since the remote instance may exist.
    #[instrument(skip_all, fields(identifier = %config.identifier, op_id = %Uuid::new_v4()))]
    pub async fn bring_up(
        &self,
        record: &mut ResourceRecord,
        config: &DbInstanceConfig,
        cancel: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        if let Some(existing) = &record.identifier {
            return Err(LifecycleError::AlreadyProvisioned(existing.clone()));
        }
        let spec = self.creation_spec()?;
        let _guard = self.claim(&config.identifier)?;

        info!(engine = %config.engine, class = %config.instance_class, "creating instance");
        let identifier =
            self.gateway
                .create(config)
                .await
                .map_err(|source| LifecycleError::MutationFailed {
                    operation: Operation::Create,
                    identifier: config.identifier.clone(),
                    source,
                })?;

        // Providers may normalise the requested name; guard the one we poll.
        let _assigned = if identifier == config.identifier {
            None
        } else {
            Some(self.claim(&identifier)?)
        };

        info!(identifier = %identifier, "waiting for instance to become available");
        let outcome = self.await_convergence(&spec, &identifier, cancel).await;
        if resolve(&identifier, spec.target(), outcome)?.is_none() {
            return Err(LifecycleError::Disappeared {
                identifier,
                expected: spec.target().clone(),
                last_status: None,
            });
        }

        let snapshot = self.read_back(&identifier, spec.target()).await?;
        info!(
            identifier = %identifier,
            endpoint = ?snapshot.endpoint.as_ref().map(ToString::to_string),
            "instance available"
        );
        record.adopt(identifier, snapshot);
        Ok(())
    }

    /// Bring remote tags in line with `desired`.
    ///
    /// Synchronous: no convergence wait. An empty diff issues no call. On
    /// success the new tags are persisted before the snapshot is re-read,
    /// so a failed read does not undo them.
    #[instrument(skip_all, fields(identifier = ?record.identifier.as_ref().map(ResourceId::as_str)))]
    pub async fn reconcile_tags(
        &self,
        record: &mut ResourceRecord,
        desired: &Tags,
    ) -> Result<TagDiff, LifecycleError> {
        let identifier = record
            .identifier
            .clone()
            .ok_or(LifecycleError::NotProvisioned)?;

        let diff = TagDiff::between(&record.tags, desired);
        if diff.is_empty() {
            info!("tags already up to date");
            return Ok(diff);
        }

        let guard = self.claim(&identifier)?;
        info!(set = diff.set.len(), removed = diff.remove.len(), "updating tags");
        self.gateway
            .update_tags(&identifier, &diff)
            .await
            .map_err(|source| LifecycleError::MutationFailed {
                operation: Operation::UpdateTags,
                identifier: identifier.clone(),
                source,
            })?;
        drop(guard);

        record.tags = desired.clone();
        record.touch();

        self.refresh(record).await?;
        Ok(diff)
    }

    /// Re-read the instance into the record.
    ///
    /// A missing instance clears the record.
    #[instrument(skip_all, fields(identifier = ?record.identifier.as_ref().map(ResourceId::as_str)))]
    pub async fn refresh(
        &self,
        record: &mut ResourceRecord,
    ) -> Result<RefreshOutcome, LifecycleError> {
        let Some(identifier) = record.identifier.clone() else {
            return Ok(RefreshOutcome::Untracked);
        };

        match self.gateway.describe(&identifier).await {
            Ok(Some(snapshot)) => {
                let status = snapshot.status.clone();
                record.observe(snapshot);
                Ok(RefreshOutcome::Updated(status))
            }
            Ok(None) => {
                warn!("instance no longer exists, clearing record");
                record.clear();
                Ok(RefreshOutcome::Gone)
            }
            Err(source) => Err(LifecycleError::ProbeFailed {
                identifier,
                last_status: record.last_status().cloned(),
                source,
            }),
        }
    }

    /// Delete the instance and wait until the provider no longer knows it.
    ///
    /// The record is cleared only once the instance is confirmed gone; on
    /// failure, timeout, or cancellation it is left as-is so the caller can
    /// retry. A record without an identifier is a no-op.
    #[instrument(skip_all, fields(identifier = ?record.identifier.as_ref().map(ResourceId::as_str), op_id = %Uuid::new_v4()))]
    pub async fn tear_down(
        &self,
        record: &mut ResourceRecord,
        final_snapshot: &FinalSnapshot,
        cancel: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        let Some(identifier) = record.identifier.clone() else {
            info!("nothing to delete");
            return Ok(());
        };
        let spec = self.deletion_spec()?;
        let _guard = self.claim(&identifier)?;

        info!(final_snapshot = ?final_snapshot.name(), "deleting instance");
        self.gateway
            .delete(&identifier, final_snapshot)
            .await
            .map_err(|source| LifecycleError::MutationFailed {
                operation: Operation::Delete,
                identifier: identifier.clone(),
                source,
            })?;

        info!("waiting for instance to be destroyed");
        let outcome = self.await_convergence(&spec, &identifier, cancel).await;
        if let Some(snapshot) = resolve(&identifier, spec.target(), outcome)? {
            return Err(LifecycleError::UnexpectedState {
                identifier,
                status: snapshot.status,
                expected: TargetState::Gone,
            });
        }

        info!("instance destroyed");
        record.clear();
        Ok(())
    }

    fn claim(&self, identifier: &ResourceId) -> Result<InFlightGuard, LifecycleError> {
        self.in_flight
            .try_acquire(identifier)
            .ok_or_else(|| LifecycleError::OperationInProgress(identifier.clone()))
    }

    async fn await_convergence(
        &self,
        spec: &PollSpec,
        identifier: &ResourceId,
        cancel: &CancellationToken,
    ) -> PollOutcome<InstanceSnapshot> {
        let gateway: &G = &self.gateway;
        self.poller
            .wait(spec, cancel, move || probe(gateway, identifier))
            .await
    }

    async fn read_back(
        &self,
        identifier: &ResourceId,
        expected: &TargetState,
    ) -> Result<InstanceSnapshot, LifecycleError> {
        match self.gateway.describe(identifier).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(LifecycleError::Disappeared {
                identifier: identifier.clone(),
                expected: expected.clone(),
                last_status: Some(InstanceStatus::Available),
            }),
            Err(source) => Err(LifecycleError::ProbeFailed {
                identifier: identifier.clone(),
                last_status: Some(InstanceStatus::Available),
                source,
            }),
        }
    }
}

/// Map a poll outcome onto the lifecycle error taxonomy.
///
/// `Converged` yields the resource, `Vanished` yields `None`, everything
/// else is an error.
fn resolve<R>(
    identifier: &ResourceId,
    expected: &TargetState,
    outcome: PollOutcome<R>,
) -> Result<Option<R>, LifecycleError> {
    match outcome {
        PollOutcome::Converged(resource) => Ok(Some(resource)),
        PollOutcome::Vanished => Ok(None),
        PollOutcome::TimedOut {
            last_status,
            elapsed,
        } => Err(LifecycleError::Timeout {
            identifier: identifier.clone(),
            expected: expected.clone(),
            last_status,
            elapsed,
        }),
        PollOutcome::Cancelled {
            last_status,
            elapsed,
        } => Err(LifecycleError::Cancelled {
            identifier: identifier.clone(),
            last_status,
            elapsed,
        }),
        PollOutcome::Failed(PollFailure::ProbeFailed {
            source,
            last_status,
        }) => Err(LifecycleError::ProbeFailed {
            identifier: identifier.clone(),
            last_status,
            source,
        }),
        PollOutcome::Failed(PollFailure::UnexpectedState { status, target }) => {
            Err(LifecycleError::UnexpectedState {
                identifier: identifier.clone(),
                status,
                expected: target,
            })
        }
        PollOutcome::Failed(PollFailure::Disappeared {
            target,
            last_status,
        }) => Err(LifecycleError::Disappeared {
            identifier: identifier.clone(),
            expected: target,
            last_status,
        }),
    }
}
