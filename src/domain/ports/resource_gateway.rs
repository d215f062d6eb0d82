use async_trait::async_trait;

use crate::domain::error::GatewayError;
use crate::domain::models::{
    DbInstanceConfig, FinalSnapshot, InstanceSnapshot, ProbeResult, ResourceId, TagDiff,
};

/// Port to the provider API that creates, reads, and deletes instances.
///
/// Implementations must tolerate concurrent `describe` calls. Callers make
/// sure at most one mutating call is in flight per identifier.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// Start creating an instance. Returns as soon as the request is accepted.
    async fn create(&self, config: &DbInstanceConfig) -> Result<ResourceId, GatewayError>;

    /// Read the current state of an instance.
    ///
    /// # Returns
    /// * `Ok(Some(snapshot))` if the provider knows the identifier
    /// * `Ok(None)` if it does not
    /// * `Err(GatewayError)` if the query failed
    async fn describe(&self, id: &ResourceId) -> Result<Option<InstanceSnapshot>, GatewayError>;

    /// Apply tag changes. Synchronous on the provider side.
    async fn update_tags(&self, id: &ResourceId, diff: &TagDiff) -> Result<(), GatewayError>;

    /// Start deleting an instance, optionally keeping a final snapshot.
    async fn delete(&self, id: &ResourceId, final_snapshot: &FinalSnapshot)
        -> Result<(), GatewayError>;
}

/// Probe an instance once through `describe`.
pub async fn probe<G>(gateway: &G, id: &ResourceId) -> ProbeResult<InstanceSnapshot>
where
    G: ResourceGateway + ?Sized,
{
    gateway.describe(id).await.into()
}
