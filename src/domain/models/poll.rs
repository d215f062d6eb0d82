//! Convergence wait configuration and results.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::{InstanceStatus, TargetState};
use crate::domain::error::{GatewayError, PollFailure, PollSpecError};

/// Timing policy for one kind of convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Wait before the first probe.
    pub initial_delay: Duration,
    /// Minimum spacing between the starts of two probes.
    pub min_interval: Duration,
    /// Deadline for the whole wait, measured from the start of the call.
    pub timeout: Duration,
}

impl PollPolicy {
    /// 30s settle delay, 10s between probes, 40 minute deadline.
    pub const fn provisioning() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            min_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(40 * 60),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::provisioning()
    }
}

/// Immutable description of one convergence wait.
///
/// Built through [`PollSpec::builder`], which rejects a missing or zero
/// timeout, a target that is also listed as pending, a settle delay that
/// would consume the whole deadline, and a zero probe interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pending: BTreeSet<InstanceStatus>,
    target: TargetState,
    initial_delay: Duration,
    min_interval: Duration,
    timeout: Duration,
}

/// How a single observed status relates to a [`PollSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Target,
    Pending,
    Unexpected,
}

impl PollSpec {
    pub fn builder(target: TargetState) -> PollSpecBuilder {
        PollSpecBuilder {
            pending: BTreeSet::new(),
            target,
            initial_delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn pending(&self) -> &BTreeSet<InstanceStatus> {
        &self.pending
    }

    pub fn target(&self) -> &TargetState {
        &self.target
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn classify(&self, status: &InstanceStatus) -> StatusClass {
        if self.target.matches(status) {
            StatusClass::Target
        } else if self.pending.contains(status) {
            StatusClass::Pending
        } else {
            StatusClass::Unexpected
        }
    }
}

/// Builder for [`PollSpec`].
#[derive(Debug, Clone)]
pub struct PollSpecBuilder {
    pending: BTreeSet<InstanceStatus>,
    target: TargetState,
    initial_delay: Duration,
    min_interval: Duration,
    timeout: Option<Duration>,
}

impl PollSpecBuilder {
    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InstanceStatus>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply all three timing values of a policy.
    pub fn policy(self, policy: PollPolicy) -> Self {
        self.initial_delay(policy.initial_delay)
            .min_interval(policy.min_interval)
            .timeout(policy.timeout)
    }

    pub fn build(self) -> Result<PollSpec, PollSpecError> {
        let timeout = match self.timeout {
            None => return Err(PollSpecError::MissingTimeout),
            Some(timeout) if timeout.is_zero() => return Err(PollSpecError::ZeroTimeout),
            Some(timeout) => timeout,
        };

        if let TargetState::Status(target) = &self.target {
            if self.pending.contains(target) {
                return Err(PollSpecError::TargetIsPending(target.clone()));
            }
        }

        if self.initial_delay >= timeout {
            return Err(PollSpecError::DelayExceedsTimeout {
                initial_delay: self.initial_delay,
                timeout,
            });
        }

        if self.min_interval.is_zero() {
            return Err(PollSpecError::ZeroInterval);
        }

        Ok(PollSpec {
            pending: self.pending,
            target: self.target,
            initial_delay: self.initial_delay,
            min_interval: self.min_interval,
            timeout,
        })
    }
}

/// Anything the poller can read a status label from.
pub trait StatusBearing {
    fn status(&self) -> InstanceStatus;
}

impl StatusBearing for InstanceStatus {
    fn status(&self) -> InstanceStatus {
        self.clone()
    }
}

/// Result of one status probe.
#[derive(Debug, Clone)]
pub enum ProbeResult<R> {
    /// The resource exists and reported a status.
    Observed(R),
    /// The provider does not know the identifier.
    NotFound,
    /// The query itself failed.
    Error(GatewayError),
}

impl<R> From<Result<Option<R>, GatewayError>> for ProbeResult<R> {
    fn from(result: Result<Option<R>, GatewayError>) -> Self {
        match result {
            Ok(Some(resource)) => Self::Observed(resource),
            Ok(None) => Self::NotFound,
            Err(err) => Self::Error(err),
        }
    }
}

/// Terminal result of a convergence wait. Exactly one per invocation.
#[derive(Debug)]
pub enum PollOutcome<R> {
    /// The last probe reported the target status.
    Converged(R),
    /// The resource is gone and the target was [`TargetState::Gone`].
    Vanished,
    /// The deadline passed while the resource was still pending.
    TimedOut {
        last_status: Option<InstanceStatus>,
        elapsed: Duration,
    },
    /// A probe failed or reported a status the `PollSpec` does not allow.
    Failed(PollFailure),
    /// The caller aborted the wait.
    Cancelled {
        last_status: Option<InstanceStatus>,
        elapsed: Duration,
    },
}

impl<R> PollOutcome<R> {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::Vanished)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converged(_) => "converged",
            Self::Vanished => "vanished",
            Self::TimedOut { .. } => "timed_out",
            Self::Failed(_) => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
