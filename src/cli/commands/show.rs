//! Show command: list locally recorded instances.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::FileRecordStore;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, ResourceRecord};
use crate::domain::ports::RecordStore;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Only show this record
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordOutput {
    pub name: String,
    pub identifier: Option<String>,
    pub status: Option<String>,
    pub endpoint: Option<String>,
    pub tags: usize,
    pub updated_at: Option<String>,
}

impl RecordOutput {
    fn new(name: String, record: &ResourceRecord) -> Self {
        let snapshot = record.snapshot.as_ref();
        Self {
            name,
            identifier: record.identifier.as_ref().map(ToString::to_string),
            status: record.last_status().map(|s| s.as_str().to_string()),
            endpoint: snapshot
                .and_then(|s| s.endpoint.as_ref())
                .map(ToString::to_string),
            tags: record.tags.len(),
            updated_at: record.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordListOutput {
    pub records: Vec<RecordOutput>,
    pub total: usize,
}

impl CommandOutput for RecordListOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No records found.".to_string();
        }

        let mut lines = vec![format!("Found {} record(s):\n", self.total)];
        lines.push(format!(
            "{:<20} {:<12} {:<30} {:<5}",
            "NAME", "STATUS", "ENDPOINT", "TAGS"
        ));
        lines.push("-".repeat(70));

        for record in &self.records {
            lines.push(format!(
                "{:<20} {:<12} {:<30} {:<5}",
                truncate(&record.name, 20),
                record.status.as_deref().unwrap_or("-"),
                truncate(record.endpoint.as_deref().unwrap_or("-"), 30),
                record.tags
            ));
        }
        lines.join("\n")
    }
}

pub async fn collect(store: &dyn RecordStore, name: Option<&str>) -> Result<RecordListOutput> {
    let records: Vec<RecordOutput> = match name {
        Some(name) => store
            .load(name)
            .await
            .context("Failed to read record store")?
            .map(|record| RecordOutput::new(name.to_string(), &record))
            .into_iter()
            .collect(),
        None => store
            .list()
            .await
            .context("Failed to read record store")?
            .into_iter()
            .map(|(name, record)| RecordOutput::new(name, &record))
            .collect(),
    };

    Ok(RecordListOutput {
        total: records.len(),
        records,
    })
}

pub async fn execute(args: ShowArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = FileRecordStore::new(&config.state.path);
    let out = collect(&store, args.name.as_deref()).await?;
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ResourceId;

    #[tokio::test]
    async fn test_lists_saved_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path().join("state.json"));
        let mut record = ResourceRecord::new();
        record.identifier = Some(ResourceId::new("orders-db"));
        store.save("orders-db", &record).await.unwrap();

        let all = collect(&store, None).await.unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.records[0].identifier.as_deref(), Some("orders-db"));
        assert!(all.records[0].status.is_none());

        let missing = collect(&store, Some("billing-db")).await.unwrap();
        assert_eq!(missing.total, 0);
        assert_eq!(missing.to_human(), "No records found.");
    }
}
