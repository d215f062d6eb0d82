//! ConvergencePoller - waits for a remote resource to settle
//!
//! Repeatedly probes a resource until it reaches the target status, is
//! confirmed gone, or reports a status the `PollSpec` does not allow:
//! - Settle delay before the first probe
//! - Minimum spacing between probe starts, without compounding drift
//! - Hard deadline measured from the start of the call
//! - Caller-driven cancellation through a `CancellationToken`
//!
//! Probe errors are terminal for the wait. Retrying a failed query is the
//! probe's own business.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::PollFailure;
use crate::domain::models::{
    InstanceStatus, PollOutcome, PollSpec, ProbeResult, StatusBearing, StatusClass,
};
use crate::domain::ports::Clock;

/// Drives a status probe until a [`PollSpec`] resolves.
///
/// Holds no state between waits; one poller can serve any number of
/// concurrent waits.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use dbconverge::adapters::TokioClock;
/// use dbconverge::domain::models::{InstanceStatus, PollSpec, ProbeResult, TargetState};
/// use dbconverge::services::ConvergencePoller;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let spec = PollSpec::builder(TargetState::status("available"))
///     .pending(["creating", "modifying"])
///     .min_interval(Duration::from_secs(10))
///     .timeout(Duration::from_secs(600))
///     .build()?;
///
/// let poller = ConvergencePoller::new(Arc::new(TokioClock));
/// let outcome = poller
///     .wait(&spec, &CancellationToken::new(), || async {
///         ProbeResult::Observed(InstanceStatus::Available)
///     })
///     .await;
/// assert!(outcome.is_converged());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConvergencePoller {
    clock: Arc<dyn Clock>,
}

impl ConvergencePoller {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Wait until `probe` reports an outcome allowed by `spec`.
    ///
    /// # Arguments
    /// * `spec` - Pending/target classification and timing
    /// * `cancel` - Aborts the wait with [`PollOutcome::Cancelled`]
    /// * `probe` - Queries the resource once per call
    ///
    /// # Returns
    /// Exactly one [`PollOutcome`]. No probe is issued once the deadline has
    /// passed or cancellation has been requested.
    #[instrument(skip_all, fields(target = %spec.target()))]
    pub async fn wait<R, F, Fut>(
        &self,
        spec: &PollSpec,
        cancel: &CancellationToken,
        mut probe: F,
    ) -> PollOutcome<R>
    where
        R: StatusBearing,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<R>>,
    {
        let started = self.clock.now();
        let deadline = started + spec.timeout();
        let mut last_status: Option<InstanceStatus> = None;
        let mut attempt: u32 = 0;

        debug!(
            initial_delay_ms = spec.initial_delay().as_millis(),
            min_interval_ms = spec.min_interval().as_millis(),
            timeout_ms = spec.timeout().as_millis(),
            "starting convergence wait"
        );

        if !self.pause(spec.initial_delay(), cancel).await {
            return self.cancelled(started, last_status);
        }

        loop {
            let iteration_started = self.clock.now();
            if iteration_started >= deadline {
                return self.timed_out(started, attempt, last_status);
            }
            if cancel.is_cancelled() {
                return self.cancelled(started, last_status);
            }

            // A probe that never answers still ends at the deadline.
            attempt += 1;
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return self.cancelled(started, last_status),
                result = probe() => result,
                () = self.clock.sleep(deadline - iteration_started) => {
                    warn!(attempt, "status probe still outstanding at the deadline");
                    return self.timed_out(started, attempt, last_status);
                }
            };

            match result {
                ProbeResult::Error(source) => {
                    warn!(attempt, error = %source, "status probe failed");
                    return PollOutcome::Failed(PollFailure::ProbeFailed {
                        source,
                        last_status,
                    });
                }
                ProbeResult::NotFound if spec.target().is_gone() => {
                    info!(attempt, "resource is gone");
                    return PollOutcome::Vanished;
                }
                ProbeResult::NotFound => {
                    warn!(attempt, "resource disappeared while waiting");
                    return PollOutcome::Failed(PollFailure::Disappeared {
                        target: spec.target().clone(),
                        last_status,
                    });
                }
                ProbeResult::Observed(resource) => {
                    let status = resource.status();
                    match spec.classify(&status) {
                        StatusClass::Target => {
                            info!(attempt, status = %status, "resource converged");
                            return PollOutcome::Converged(resource);
                        }
                        StatusClass::Unexpected => {
                            warn!(attempt, status = %status, "unexpected resource status");
                            return PollOutcome::Failed(PollFailure::UnexpectedState {
                                status,
                                target: spec.target().clone(),
                            });
                        }
                        StatusClass::Pending => {
                            debug!(
                                attempt,
                                status = %status,
                                elapsed_ms = (self.clock.now() - started).as_millis(),
                                "resource still pending"
                            );
                            last_status = Some(status);
                        }
                    }
                }
            }

            let now = self.clock.now();
            if now >= deadline {
                continue;
            }

            // Interval floor counts from the start of this iteration; never sleep past the deadline.
            let spent = now - iteration_started;
            let wait = spec.min_interval().saturating_sub(spent).min(deadline - now);
            if !self.pause(wait, cancel).await {
                return self.cancelled(started, last_status);
            }
        }
    }

    /// Sleep unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = self.clock.sleep(duration) => true,
        }
    }

    fn timed_out<R>(
        &self,
        started: tokio::time::Instant,
        attempts: u32,
        last_status: Option<InstanceStatus>,
    ) -> PollOutcome<R> {
        let elapsed = self.clock.now() - started;
        warn!(
            attempts,
            last_status = ?last_status.as_ref().map(InstanceStatus::as_str),
            elapsed_ms = elapsed.as_millis(),
            "convergence wait timed out"
        );
        PollOutcome::TimedOut {
            last_status,
            elapsed,
        }
    }

    fn cancelled<R>(
        &self,
        started: tokio::time::Instant,
        last_status: Option<InstanceStatus>,
    ) -> PollOutcome<R> {
        let elapsed = self.clock.now() - started;
        info!(elapsed_ms = elapsed.as_millis(), "convergence wait cancelled");
        PollOutcome::Cancelled {
            last_status,
            elapsed,
        }
    }
}

impl std::fmt::Debug for ConvergencePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergencePoller").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::domain::error::GatewayError;
    use crate::domain::models::TargetState;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unit() -> Duration {
        Duration::from_secs(1)
    }

    fn create_spec() -> PollSpec {
        PollSpec::builder(TargetState::status("available"))
            .pending(["creating", "modifying"])
            .min_interval(unit())
            .timeout(unit() * 5)
            .build()
            .unwrap()
    }

    fn observed(label: &str) -> ProbeResult<InstanceStatus> {
        ProbeResult::Observed(InstanceStatus::parse(label))
    }

    /// Probe answering from a fixed script and counting its calls.
    fn scripted(
        steps: Vec<ProbeResult<InstanceStatus>>,
    ) -> (
        impl FnMut() -> std::future::Ready<ProbeResult<InstanceStatus>>,
        Arc<AtomicUsize>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut steps: VecDeque<_> = steps.into();
        let probe = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(steps.pop_front().unwrap_or_else(|| {
                ProbeResult::Error(GatewayError::Transport("script exhausted".to_string()))
            }))
        };
        (probe, calls)
    }

    #[tokio::test]
    async fn test_converges_after_pending_probes() {
        let clock = Arc::new(ManualClock::new());
        let poller = ConvergencePoller::new(clock.clone());
        let (probe, calls) = scripted(vec![
            observed("creating"),
            observed("creating"),
            observed("available"),
        ]);

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        assert!(matches!(outcome, PollOutcome::Converged(InstanceStatus::Available)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(clock.elapsed() >= unit() * 2);
    }

    #[tokio::test]
    async fn test_times_out_without_extra_probe() {
        let clock = Arc::new(ManualClock::new());
        let poller = ConvergencePoller::new(clock.clone());
        let (probe, calls) = scripted(vec![observed("creating"); 10]);

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        match outcome {
            PollOutcome::TimedOut {
                last_status,
                elapsed,
            } => {
                assert_eq!(last_status, Some(InstanceStatus::Creating));
                assert_eq!(elapsed, unit() * 5);
            }
            other => panic!("expected timeout, got {}", other.label()),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_probe_error_is_terminal() {
        let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
        let (probe, calls) = scripted(vec![
            observed("creating"),
            ProbeResult::Error(GatewayError::Throttled("rate exceeded".to_string())),
            observed("available"),
        ]);

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        match outcome {
            PollOutcome::Failed(PollFailure::ProbeFailed {
                source,
                last_status,
            }) => {
                assert!(source.is_transient());
                assert_eq!(last_status, Some(InstanceStatus::Creating));
            }
            other => panic!("expected probe failure, got {}", other.label()),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unexpected_status_fails_immediately() {
        let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
        let (probe, calls) = scripted(vec![
            observed("creating"),
            observed("modifying"),
            observed("storage-full"),
            observed("available"),
        ]);

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        assert!(matches!(
            outcome,
            PollOutcome::Failed(PollFailure::UnexpectedState { ref status, .. })
                if status.as_str() == "storage-full"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_vanishes_for_gone_target() {
        let spec = PollSpec::builder(TargetState::Gone)
            .pending(["deleting"])
            .min_interval(unit())
            .timeout(unit() * 5)
            .build()
            .unwrap();
        let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
        let (probe, calls) = scripted(vec![observed("deleting"), ProbeResult::NotFound]);

        let outcome = poller.wait(&spec, &CancellationToken::new(), probe).await;

        assert!(outcome.is_vanished());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_fails_for_status_target() {
        let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
        let (probe, _calls) = scripted(vec![observed("creating"), ProbeResult::NotFound]);

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        assert!(matches!(
            outcome,
            PollOutcome::Failed(PollFailure::Disappeared {
                last_status: Some(InstanceStatus::Creating),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_initial_delay_counts_against_deadline() {
        let spec = PollSpec::builder(TargetState::status("available"))
            .pending(["creating"])
            .initial_delay(unit() * 3)
            .min_interval(unit())
            .timeout(unit() * 5)
            .build()
            .unwrap();
        let clock = Arc::new(ManualClock::new());
        let poller = ConvergencePoller::new(clock.clone());
        let (probe, calls) = scripted(vec![observed("creating"); 10]);

        let outcome = poller.wait(&spec, &CancellationToken::new(), probe).await;

        assert!(outcome.is_timed_out());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(clock.elapsed(), unit() * 5);
    }

    #[tokio::test]
    async fn test_slow_probe_shortens_the_sleep() {
        let clock = Arc::new(ManualClock::new());
        let poller = ConvergencePoller::new(clock.clone());
        let probe_clock = clock.clone();
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&starts);
        let mut remaining = 3;

        let outcome = poller
            .wait(&create_spec(), &CancellationToken::new(), move || {
                seen.lock().unwrap().push(probe_clock.elapsed());
                probe_clock.advance(Duration::from_millis(400));
                remaining -= 1;
                let label = if remaining == 0 { "available" } else { "creating" };
                std::future::ready(observed(label))
            })
            .await;

        assert!(outcome.is_converged());
        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts, vec![Duration::ZERO, unit(), unit() * 2]);
    }

    #[tokio::test]
    async fn test_cancel_before_start_issues_no_probe() {
        let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
        let (probe, calls) = scripted(vec![observed("available")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poller.wait(&create_spec(), &cancel, probe).await;

        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_wait_with_paused_runtime() {
        let poller = ConvergencePoller::new(Arc::new(crate::adapters::TokioClock));
        let (probe, calls) = scripted(vec![
            observed("creating"),
            observed("modifying"),
            observed("available"),
        ]);
        let started = tokio::time::Instant::now();

        let outcome = poller.wait(&create_spec(), &CancellationToken::new(), probe).await;

        assert!(outcome.is_converged());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= unit() * 2);
    }
}
