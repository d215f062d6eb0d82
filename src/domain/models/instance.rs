//! Database instance model: desired configuration, observed snapshot, tags.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::poll::StatusBearing;
use super::status::InstanceStatus;

/// Stable provider-side identifier of a database instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Master password. Never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Resource tags keyed by tag name.
pub type Tags = BTreeMap<String, String>;

/// Desired configuration of a database instance.
///
/// Optional provider settings stay `None` unless the caller set them; the
/// gateway decides what an absent value means when it builds the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInstanceConfig {
    pub identifier: ResourceId,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub username: String,
    pub password: Password,

    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub storage_encrypted: bool,
    #[serde(default)]
    pub iops: Option<u32>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub multi_az: Option<bool>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default = "default_backup_retention_period")]
    pub backup_retention_period: u32,
    #[serde(default)]
    pub backup_window: Option<String>,
    #[serde(default)]
    pub maintenance_window: Option<String>,
    #[serde(default)]
    pub publicly_accessible: Option<bool>,
    #[serde(default)]
    pub db_subnet_group_name: Option<String>,
    #[serde(default)]
    pub parameter_group_name: Option<String>,
    #[serde(default)]
    pub vpc_security_group_ids: Vec<String>,
    #[serde(default)]
    pub security_group_names: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

const fn default_backup_retention_period() -> u32 {
    1
}

impl DbInstanceConfig {
    /// Configuration with only the required fields set.
    pub fn new(
        identifier: impl Into<String>,
        engine: impl Into<String>,
        engine_version: impl Into<String>,
        instance_class: impl Into<String>,
        allocated_storage: u32,
        username: impl Into<String>,
        password: Password,
    ) -> Self {
        Self {
            identifier: ResourceId::new(identifier),
            engine: engine.into(),
            engine_version: engine_version.into(),
            instance_class: instance_class.into(),
            allocated_storage,
            username: username.into(),
            password,
            name: None,
            storage_type: None,
            storage_encrypted: false,
            iops: None,
            port: None,
            multi_az: None,
            availability_zone: None,
            backup_retention_period: default_backup_retention_period(),
            backup_window: None,
            maintenance_window: None,
            publicly_accessible: None,
            db_subnet_group_name: None,
            parameter_group_name: None,
            vpc_security_group_ids: Vec::new(),
            security_group_names: Vec::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_availability_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = Some(zone.into());
        self
    }
}

/// Network endpoint of an available instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Last-observed state of a remote instance, as returned by `describe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub identifier: ResourceId,
    pub status: InstanceStatus,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub username: String,
    pub name: Option<String>,
    pub storage_type: Option<String>,
    pub storage_encrypted: bool,
    pub availability_zone: Option<String>,
    pub backup_retention_period: u32,
    pub backup_window: Option<String>,
    pub maintenance_window: Option<String>,
    pub multi_az: bool,
    pub db_subnet_group_name: Option<String>,
    pub parameter_group_name: Option<String>,
    /// Only known once the instance has converged.
    pub endpoint: Option<Endpoint>,
    pub vpc_security_group_ids: Vec<String>,
    pub security_group_names: Vec<String>,
    pub tags: Tags,
}

impl InstanceSnapshot {
    pub fn address(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.address.as_str())
    }

    pub fn port(&self) -> Option<u16> {
        self.endpoint.as_ref().map(|e| e.port)
    }
}

impl StatusBearing for InstanceSnapshot {
    fn status(&self) -> InstanceStatus {
        self.status.clone()
    }
}

/// Tag changes needed to go from the recorded tags to the desired ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDiff {
    /// Tags to create or overwrite.
    pub set: Tags,
    /// Tag keys to delete.
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn between(current: &Tags, desired: &Tags) -> Self {
        let set = desired
            .iter()
            .filter(|(key, value)| current.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let remove = current
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();

        Self { set, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Apply the diff to a tag map in place.
    pub fn apply(&self, tags: &mut Tags) {
        for key in &self.remove {
            tags.remove(key);
        }
        for (key, value) in &self.set {
            tags.insert(key.clone(), value.clone());
        }
    }
}

/// Whether deletion should leave a final snapshot behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSnapshot {
    #[default]
    Skip,
    Take(String),
}

impl FinalSnapshot {
    /// `None` or an empty name means skip.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.is_empty() => Self::Take(name.to_string()),
            _ => Self::Skip,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Skip => None,
            Self::Take(name) => Some(name),
        }
    }
}
