use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Time source for convergence waits.
///
/// Deadlines are computed from `now()` once at the start of a wait, so a
/// virtual implementation makes every timing decision deterministic.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}
