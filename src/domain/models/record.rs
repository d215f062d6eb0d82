use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instance::{InstanceSnapshot, ResourceId, Tags};
use super::status::InstanceStatus;

/// Locally persisted view of one managed instance.
///
/// Only written at the start or end of a lifecycle operation, never while
/// a convergence wait is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub identifier: Option<ResourceId>,
    pub snapshot: Option<InstanceSnapshot>,
    #[serde(default)]
    pub tags: Tags,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record counts as created once it holds an identifier and a snapshot.
    pub fn is_created(&self) -> bool {
        self.identifier.is_some() && self.snapshot.is_some()
    }

    pub fn last_status(&self) -> Option<&InstanceStatus> {
        self.snapshot.as_ref().map(|s| &s.status)
    }

    /// Take ownership of a converged instance.
    pub fn adopt(&mut self, identifier: ResourceId, snapshot: InstanceSnapshot) {
        self.identifier = Some(identifier);
        self.observe(snapshot);
    }

    /// Replace the snapshot and tags with a fresh observation.
    pub fn observe(&mut self, snapshot: InstanceSnapshot) {
        self.tags = snapshot.tags.clone();
        self.snapshot = Some(snapshot);
        self.touch();
    }

    pub fn clear(&mut self) {
        self.identifier = None;
        self.snapshot = None;
        self.tags.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
