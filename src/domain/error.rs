use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::models::instance::ResourceId;
use super::models::status::{InstanceStatus, TargetState};

fn last_seen(last_status: &Option<InstanceStatus>) -> String {
    match last_status {
        Some(status) => format!(" (last status: {status})"),
        None => String::new(),
    }
}

fn still_in(last_status: &Option<InstanceStatus>, elapsed: &Duration) -> String {
    match last_status {
        Some(status) => format!("still in state '{status}' after {}s", elapsed.as_secs()),
        None => format!("no status observed after {}s", elapsed.as_secs()),
    }
}

/// Errors reported by a resource gateway call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(ResourceId),
}

impl GatewayError {
    /// Whether the failure is likely to go away on its own.
    ///
    /// Informational only: neither the poller nor the controller retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Transport(_))
    }
}

/// Rejected poll specification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollSpecError {
    #[error("Poll timeout is required")]
    MissingTimeout,

    #[error("Poll timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Minimum probe interval must be greater than zero")]
    ZeroInterval,

    #[error("Target status '{0}' is also listed as pending")]
    TargetIsPending(InstanceStatus),

    #[error("Initial delay {initial_delay:?} leaves no time before the {timeout:?} deadline")]
    DelayExceedsTimeout {
        initial_delay: Duration,
        timeout: Duration,
    },
}

/// Why a convergence wait failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    #[error("Status probe failed{}: {source}", last_seen(.last_status))]
    ProbeFailed {
        source: GatewayError,
        last_status: Option<InstanceStatus>,
    },

    #[error("Unexpected status '{status}' while waiting for '{target}'")]
    UnexpectedState {
        status: InstanceStatus,
        target: TargetState,
    },

    #[error("Resource disappeared while waiting for '{target}'{}", last_seen(.last_status))]
    Disappeared {
        target: TargetState,
        last_status: Option<InstanceStatus>,
    },
}

/// Lifecycle call that mutates the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    UpdateTags,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::UpdateTags => "update-tags",
            Self::Delete => "delete",
        })
    }
}

/// Failure category of a [`LifecycleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MutationFailed,
    ProbeFailed,
    UnexpectedState,
    Timeout,
    Cancelled,
    Configuration,
    Precondition,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MutationFailed => "mutation_failed",
            Self::ProbeFailed => "probe_failed",
            Self::UnexpectedState => "unexpected_state",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
            Self::Precondition => "precondition",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by lifecycle operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{operation} request for '{identifier}' failed: {source}")]
    MutationFailed {
        operation: Operation,
        identifier: ResourceId,
        source: GatewayError,
    },

    #[error("Status probe for '{identifier}' failed{}: {source}", last_seen(.last_status))]
    ProbeFailed {
        identifier: ResourceId,
        last_status: Option<InstanceStatus>,
        source: GatewayError,
    },

    #[error("'{identifier}' entered unexpected status '{status}' while waiting for '{expected}'")]
    UnexpectedState {
        identifier: ResourceId,
        status: InstanceStatus,
        expected: TargetState,
    },

    #[error("'{identifier}' disappeared while waiting for '{expected}'{}", last_seen(.last_status))]
    Disappeared {
        identifier: ResourceId,
        expected: TargetState,
        last_status: Option<InstanceStatus>,
    },

    #[error("Timed out waiting for '{identifier}' to reach '{expected}': {}", still_in(.last_status, .elapsed))]
    Timeout {
        identifier: ResourceId,
        expected: TargetState,
        last_status: Option<InstanceStatus>,
        elapsed: Duration,
    },

    #[error("Wait for '{identifier}' was cancelled{}", last_seen(.last_status))]
    Cancelled {
        identifier: ResourceId,
        last_status: Option<InstanceStatus>,
        elapsed: Duration,
    },

    #[error("Invalid poll policy: {0}")]
    InvalidPolicy(#[from] PollSpecError),

    #[error("Another mutating operation is already in flight for '{0}'")]
    OperationInProgress(ResourceId),

    #[error("'{0}' is already provisioned")]
    AlreadyProvisioned(ResourceId),

    #[error("Record has no provisioned instance")]
    NotProvisioned,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MutationFailed { .. } => ErrorKind::MutationFailed,
            Self::ProbeFailed { .. } => ErrorKind::ProbeFailed,
            Self::UnexpectedState { .. } | Self::Disappeared { .. } => ErrorKind::UnexpectedState,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidPolicy(_) => ErrorKind::Configuration,
            Self::OperationInProgress(_) | Self::AlreadyProvisioned(_) | Self::NotProvisioned => {
                ErrorKind::Precondition
            }
        }
    }

    /// Cancellation is not success, but it is not a failure of the resource either.
    pub fn is_failure(&self) -> bool {
        self.kind() != ErrorKind::Cancelled
    }

    /// Last status observed before the operation stopped, if any.
    pub fn last_status(&self) -> Option<&InstanceStatus> {
        match self {
            Self::ProbeFailed { last_status, .. }
            | Self::Disappeared { last_status, .. }
            | Self::Timeout { last_status, .. }
            | Self::Cancelled { last_status, .. } => last_status.as_ref(),
            Self::UnexpectedState { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&ResourceId> {
        match self {
            Self::MutationFailed { identifier, .. }
            | Self::ProbeFailed { identifier, .. }
            | Self::UnexpectedState { identifier, .. }
            | Self::Disappeared { identifier, .. }
            | Self::Timeout { identifier, .. }
            | Self::Cancelled { identifier, .. } => Some(identifier),
            Self::OperationInProgress(identifier) | Self::AlreadyProvisioned(identifier) => {
                Some(identifier)
            }
            Self::InvalidPolicy(_) | Self::NotProvisioned => None,
        }
    }
}

/// Errors from the local record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
