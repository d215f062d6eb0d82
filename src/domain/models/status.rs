use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Status label reported by the provider for a database instance.
///
/// The labels the lifecycle operations care about are named variants;
/// anything else the provider reports is kept verbatim in `Other`.
/// Equality, ordering, and hashing all go through [`InstanceStatus::as_str`],
/// so comparison is exact string equality: `"Available"` is not `available`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Creating,
    BackingUp,
    Modifying,
    Deleting,
    Available,
    Other(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "creating",
            Self::BackingUp => "backing-up",
            Self::Modifying => "modifying",
            Self::Deleting => "deleting",
            Self::Available => "available",
            Self::Other(label) => label,
        }
    }

    /// Parse a provider label. Never fails; unknown labels become `Other`.
    pub fn parse(label: &str) -> Self {
        match label {
            "creating" => Self::Creating,
            "backing-up" => Self::BackingUp,
            "modifying" => Self::Modifying,
            "deleting" => Self::Deleting,
            "available" => Self::Available,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this label is one of the named lifecycle states.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl PartialEq for InstanceStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for InstanceStatus {}

impl Hash for InstanceStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for InstanceStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for InstanceStatus {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}

impl From<String> for InstanceStatus {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        status.as_str().to_string()
    }
}

/// What a convergence wait is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// A specific status label.
    Status(InstanceStatus),
    /// The resource no longer exists.
    Gone,
}

impl TargetState {
    pub fn status(status: impl Into<InstanceStatus>) -> Self {
        Self::Status(status.into())
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }

    /// True when `status` is exactly the target label.
    pub fn matches(&self, status: &InstanceStatus) -> bool {
        match self {
            Self::Status(target) => target == status,
            Self::Gone => false,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "{status}"),
            Self::Gone => f.write_str("gone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(InstanceStatus::parse("creating"), InstanceStatus::Creating);
        assert_eq!(InstanceStatus::parse("backing-up"), InstanceStatus::BackingUp);
        assert_eq!(InstanceStatus::parse("modifying"), InstanceStatus::Modifying);
        assert_eq!(InstanceStatus::parse("deleting"), InstanceStatus::Deleting);
        assert_eq!(InstanceStatus::parse("available"), InstanceStatus::Available);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        let status = InstanceStatus::parse("Available");
        assert!(!status.is_known());
        assert_ne!(status, InstanceStatus::Available);
        assert_eq!(status.as_str(), "Available");
    }

    #[test]
    fn test_other_with_known_label_compares_equal() {
        let hand_built = InstanceStatus::Other("available".to_string());
        assert_eq!(hand_built, InstanceStatus::Available);

        let set: BTreeSet<_> = [InstanceStatus::Available].into_iter().collect();
        assert!(set.contains(&hand_built));
    }

    #[test]
    fn test_serde_uses_plain_labels() {
        let json = serde_json::to_string(&InstanceStatus::BackingUp).unwrap();
        assert_eq!(json, "\"backing-up\"");

        let parsed: InstanceStatus = serde_json::from_str("\"storage-full\"").unwrap();
        assert_eq!(parsed, InstanceStatus::Other("storage-full".to_string()));
    }

    #[test]
    fn test_target_matching() {
        let target = TargetState::status("available");
        assert!(target.matches(&InstanceStatus::Available));
        assert!(!target.matches(&InstanceStatus::Creating));
        assert!(!TargetState::Gone.matches(&InstanceStatus::Deleting));
        assert_eq!(TargetState::Gone.to_string(), "gone");
    }
}
