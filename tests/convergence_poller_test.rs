//! Integration tests for ConvergencePoller timing and outcomes.

mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dbconverge::adapters::{ManualClock, TokioClock};
use dbconverge::domain::error::{GatewayError, PollFailure};
use dbconverge::domain::models::{InstanceStatus, PollOutcome, PollSpec, ProbeResult, TargetState};
use dbconverge::services::ConvergencePoller;
use tokio_util::sync::CancellationToken;

const UNIT: Duration = Duration::from_secs(1);

fn spec(target: TargetState, pending: &[&str], interval: Duration, timeout: Duration) -> PollSpec {
    PollSpec::builder(target)
        .pending(pending.iter().copied())
        .min_interval(interval)
        .timeout(timeout)
        .build()
        .unwrap()
}

/// Probe replaying a script, repeating the last step once exhausted.
#[derive(Clone)]
struct Script {
    steps: Arc<Mutex<VecDeque<ProbeResult<InstanceStatus>>>>,
    calls: Arc<AtomicUsize>,
}

impl Script {
    fn new(labels: &[&str]) -> Self {
        Self::from_results(
            labels
                .iter()
                .map(|l| ProbeResult::Observed(InstanceStatus::parse(l)))
                .collect(),
        )
    }

    fn from_results(steps: Vec<ProbeResult<InstanceStatus>>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next(&self) -> ProbeResult<InstanceStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_fast_convergence() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());
    let script = Script::new(&["creating", "creating", "available"]);
    let probe = script.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 10),
            &CancellationToken::new(),
            move || std::future::ready(probe.next()),
        )
        .await;

    assert!(matches!(outcome, PollOutcome::Converged(InstanceStatus::Available)));
    assert_eq!(script.calls(), 3);
    assert_eq!(clock.elapsed(), UNIT * 2);
}

#[tokio::test]
async fn test_stuck_resource_times_out_at_the_deadline() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());
    let script = Script::new(&["creating"]);
    let probe = script.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 5),
            &CancellationToken::new(),
            move || std::future::ready(probe.next()),
        )
        .await;

    match outcome {
        PollOutcome::TimedOut {
            last_status,
            elapsed,
        } => {
            assert_eq!(last_status, Some(InstanceStatus::Creating));
            assert_eq!(elapsed, UNIT * 5);
        }
        other => panic!("Expected TimedOut, got {}", other.label()),
    }
    // 0s, 1s, 2s, 3s, 4s; none at the deadline itself
    assert_eq!(script.calls(), 5);
}

#[tokio::test]
async fn test_deletion_completes_on_not_found() {
    let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
    let script = Script::from_results(vec![
        ProbeResult::Observed(InstanceStatus::Deleting),
        ProbeResult::Observed(InstanceStatus::Deleting),
        ProbeResult::NotFound,
    ]);
    let probe = script.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::Gone, &["deleting", "available"], UNIT, UNIT * 10),
            &CancellationToken::new(),
            move || std::future::ready(probe.next()),
        )
        .await;

    assert!(outcome.is_vanished());
    assert_eq!(script.calls(), 3);
}

#[tokio::test]
async fn test_probe_error_reports_last_status() {
    let poller = ConvergencePoller::new(Arc::new(ManualClock::new()));
    let script = Script::from_results(vec![
        ProbeResult::Observed(InstanceStatus::Creating),
        ProbeResult::Error(GatewayError::Transport("connection reset".to_string())),
        ProbeResult::Observed(InstanceStatus::Available),
    ]);
    let probe = script.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 10),
            &CancellationToken::new(),
            move || std::future::ready(probe.next()),
        )
        .await;

    match outcome {
        PollOutcome::Failed(PollFailure::ProbeFailed {
            source,
            last_status,
        }) => {
            assert_eq!(source, GatewayError::Transport("connection reset".to_string()));
            assert_eq!(last_status, Some(InstanceStatus::Creating));
        }
        other => panic!("Expected ProbeFailed, got {}", other.label()),
    }
    assert_eq!(script.calls(), 2);
}

#[tokio::test]
async fn test_cancel_between_second_and_third_probe() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());
    let script = Script::new(&["creating"]);
    let probe = script.clone();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 10),
            &cancel,
            move || {
                let result = probe.next();
                if probe.calls() == 2 {
                    trigger.cancel();
                }
                std::future::ready(result)
            },
        )
        .await;

    match outcome {
        PollOutcome::Cancelled {
            last_status,
            elapsed,
        } => {
            assert_eq!(last_status, Some(InstanceStatus::Creating));
            assert_eq!(elapsed, UNIT);
        }
        other => panic!("Expected Cancelled, got {}", other.label()),
    }
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_the_sleep() {
    let poller = ConvergencePoller::new(Arc::new(TokioClock));
    let script = Script::new(&["creating"]);
    let probe = script.clone();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let wait_spec = spec(
        TargetState::status("available"),
        &["creating"],
        UNIT * 10,
        UNIT * 600,
    );

    let handle = tokio::spawn(async move {
        poller
            .wait(&wait_spec, &cancel, move || std::future::ready(probe.next()))
            .await
    });

    tokio::time::sleep(UNIT * 15).await;
    trigger.cancel();
    let outcome = handle.await.unwrap();

    match outcome {
        PollOutcome::Cancelled { elapsed, .. } => {
            assert!(elapsed >= UNIT * 15 && elapsed < UNIT * 20, "{elapsed:?}");
        }
        other => panic!("Expected Cancelled, got {}", other.label()),
    }
    // 0s and 10s; cancelled while sleeping towards 20s
    assert_eq!(script.calls(), 2);
}

#[tokio::test]
async fn test_unexpected_status_short_circuits() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());
    let script = Script::new(&["creating", "failed", "available"]);
    let probe = script.clone();

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 10),
            &CancellationToken::new(),
            move || std::future::ready(probe.next()),
        )
        .await;

    assert!(matches!(
        outcome,
        PollOutcome::Failed(PollFailure::UnexpectedState { ref status, .. }) if status.as_str() == "failed"
    ));
    assert_eq!(script.calls(), 2);
    assert_eq!(clock.elapsed(), UNIT);
}

#[tokio::test]
async fn test_probes_are_spaced_by_min_interval() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let script = Script::new(&["creating", "creating", "creating", "available"]);

    let probe_clock = clock.clone();
    let probe_seen = seen.clone();
    let probe = script.clone();
    let policy = PollSpec::builder(TargetState::status("available"))
        .pending(["creating"])
        .initial_delay(UNIT * 3)
        .min_interval(UNIT * 2)
        .timeout(UNIT * 60)
        .build()
        .unwrap();

    let outcome = poller
        .wait(&policy, &CancellationToken::new(), move || {
            probe_seen.lock().unwrap().push(probe_clock.elapsed());
            std::future::ready(probe.next())
        })
        .await;

    assert!(outcome.is_converged());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![UNIT * 3, UNIT * 5, UNIT * 7, UNIT * 9]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_times_out_at_the_deadline() {
    let poller = ConvergencePoller::new(Arc::new(TokioClock));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let started = tokio::time::Instant::now();

    // First describe answers, the second never returns.
    let wait_spec = spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 5);
    let cancel = CancellationToken::new();
    let wait = poller.wait(
        &wait_spec,
        &cancel,
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    ProbeResult::Observed(InstanceStatus::Creating)
                } else {
                    std::future::pending().await
                }
            }
        },
    );
    let outcome = tokio::time::timeout(UNIT * 3600, wait)
        .await
        .expect("wait should end at its own deadline");

    match outcome {
        PollOutcome::TimedOut {
            last_status,
            elapsed,
        } => {
            assert_eq!(last_status, Some(InstanceStatus::Creating));
            assert_eq!(elapsed, UNIT * 5);
        }
        other => panic!("Expected TimedOut, got {}", other.label()),
    }
    assert_eq!(started.elapsed(), UNIT * 5);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_hung_first_probe_times_out_on_virtual_clock() {
    let clock = Arc::new(ManualClock::new());
    let poller = ConvergencePoller::new(clock.clone());

    let outcome = poller
        .wait(
            &spec(TargetState::status("available"), &["creating"], UNIT, UNIT * 5),
            &CancellationToken::new(),
            std::future::pending::<ProbeResult<InstanceStatus>>,
        )
        .await;

    assert!(matches!(
        outcome,
        PollOutcome::TimedOut {
            last_status: None,
            ..
        }
    ));
    assert_eq!(clock.elapsed(), UNIT * 5);
}
