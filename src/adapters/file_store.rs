//! JSON-file backed record store.
//!
//! All records live in one JSON object keyed by record name. Writes go to a
//! sibling temp file first and are renamed into place.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::error::StoreError;
use crate::domain::models::ResourceRecord;
use crate::domain::ports::RecordStore;

type RecordMap = BTreeMap<String, ResourceRecord>;

/// Record store persisting to a single JSON file.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<RecordMap, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(RecordMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RecordMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_all(&self, records: &RecordMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), records = records.len(), "record store written");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, key: &str) -> Result<Option<ResourceRecord>, StoreError> {
        let mut records = self.read_all().await?;
        Ok(records.remove(key))
    }

    async fn save(&self, key: &str, record: &ResourceRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        records.insert(key.to_string(), record.clone());
        self.write_all(&records).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        if records.remove(key).is_some() {
            self.write_all(&records).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, ResourceRecord)>, StoreError> {
        Ok(self.read_all().await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ResourceId;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileRecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path().join("nested").join("state.json"));
        (dir, store)
    }

    fn record(id: &str) -> ResourceRecord {
        ResourceRecord {
            identifier: Some(ResourceId::new(id)),
            ..ResourceRecord::default()
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let (_dir, store) = store();
        assert!(store.load("orders-db").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_dir, store) = store();
        store.save("orders-db", &record("orders-db")).await.unwrap();
        store.save("billing-db", &record("billing-db")).await.unwrap();

        let loaded = store.load("orders-db").await.unwrap().unwrap();
        assert_eq!(loaded.identifier, Some(ResourceId::new("orders-db")));

        let keys: Vec<String> = store.list().await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["billing-db".to_string(), "orders-db".to_string()]);
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_dir, store) = store();
        store.save("orders-db", &record("orders-db")).await.unwrap();

        store.remove("orders-db").await.unwrap();
        store.remove("orders-db").await.unwrap();
        assert!(store.load("orders-db").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        fs::write(store.path(), b"{not json").await.unwrap();

        let err = store.load("orders-db").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
