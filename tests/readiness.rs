// ABOUTME: Tests for the bounded container readiness wait.
// ABOUTME: Uses paused time so polling intervals cost nothing.

mod support;

use bondi::deploy::{ReadinessPolicy, WaitError, wait_until_running};
use bondi::runtime::ContainerState;
use bondi::types::ContainerId;
use std::time::Duration;
use support::fake_engine::{Call, FakeEngine};
use tokio_util::sync::CancellationToken;

fn policy(max_attempts: u32) -> ReadinessPolicy {
    ReadinessPolicy {
        max_attempts,
        interval: Duration::from_secs(1),
    }
}

fn inspects(engine: &FakeEngine) -> usize {
    engine
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Inspect(_)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn running_container_is_ready_on_first_attempt() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Running, Default::default());

    wait_until_running(&engine, &id, policy(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(inspects(&engine), 1);
}

#[tokio::test(start_paused = true)]
async fn container_that_comes_up_later_is_awaited() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Created, Default::default());
    engine.script_inspect([
        Some(ContainerState::Created),
        Some(ContainerState::Restarting),
        Some(ContainerState::Running),
    ]);

    let started = tokio::time::Instant::now();
    wait_until_running(&engine, &id, policy(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(inspects(&engine), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn absent_container_is_retried() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Running, Default::default());
    engine.script_inspect([None, None]);

    wait_until_running(&engine, &id, policy(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(inspects(&engine), 3);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts_with_last_state() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Exited, Default::default());

    let started = tokio::time::Instant::now();
    let err = wait_until_running(&engine, &id, policy(4), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        WaitError::TimedOut {
            attempts,
            last_state,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_state, ContainerState::Exited);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(inspects(&engine), 4);
    // No sleep after the final attempt.
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn unknown_container_times_out_as_absent() {
    let engine = FakeEngine::new();
    let id = ContainerId::new("doesnotexist");

    let err = wait_until_running(&engine, &id, policy(2), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WaitError::TimedOut {
            last_state: ContainerState::Absent,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn inspect_failure_is_fatal() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Running, Default::default());
    engine.fail_inspect();

    let err = wait_until_running(&engine, &id, policy(5), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WaitError::Inspect { .. }));
    assert_eq!(inspects(&engine), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Created, Default::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let err = wait_until_running(&engine, &id, policy(30), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, WaitError::Cancelled));
    assert_eq!(inspects(&engine), 3);
}

#[tokio::test]
async fn already_cancelled_wait_never_inspects() {
    let engine = FakeEngine::new();
    let id = engine.seed_container("p", "traefik:v3", ContainerState::Running, Default::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = wait_until_running(&engine, &id, policy(5), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, WaitError::Cancelled));
    assert_eq!(engine.call_count(), 0);
}
