use async_trait::async_trait;

use crate::domain::error::StoreError;
use crate::domain::models::ResourceRecord;

/// Persistence for local resource records, keyed by a caller-chosen name.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record. `Ok(None)` when nothing is stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<ResourceRecord>, StoreError>;

    /// Insert or replace a record.
    async fn save(&self, key: &str, record: &ResourceRecord) -> Result<(), StoreError>;

    /// Remove a record. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All stored records ordered by key.
    async fn list(&self) -> Result<Vec<(String, ResourceRecord)>, StoreError>;
}
