// ABOUTME: Polls a container until the engine reports it running.
// ABOUTME: Bounded attempts, cooperative sleep, and caller cancellation.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::settings::ReadinessPolicy;
use crate::runtime::{ContainerError, ContainerOps, ContainerState};
use crate::types::ContainerId;

/// Why a container never became ready.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("container {container} not running after {attempts} attempts (last state: {last_state})")]
    TimedOut {
        container: ContainerId,
        attempts: u32,
        last_state: ContainerState,
    },

    #[error("wait cancelled")]
    Cancelled,

    #[error("failed to inspect container {container}: {source}")]
    Inspect {
        container: ContainerId,
        #[source]
        source: ContainerError,
    },
}

/// Wait until `id` is running.
///
/// The state is polled once per `policy.interval`, at most
/// `policy.max_attempts` times. A container the engine does not know yet
/// counts as [`ContainerState::Absent`] and is retried like any other
/// non-running state.
pub async fn wait_until_running<E>(
    engine: &E,
    id: &ContainerId,
    policy: ReadinessPolicy,
    cancel: &CancellationToken,
) -> Result<(), WaitError>
where
    E: ContainerOps + ?Sized,
{
    let mut last_state = ContainerState::Absent;

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        last_state = match engine.inspect_container(id).await {
            Ok(info) => info.state,
            Err(ContainerError::NotFound(_)) => ContainerState::Absent,
            Err(source) => {
                return Err(WaitError::Inspect {
                    container: id.clone(),
                    source,
                });
            }
        };

        if last_state.is_running() {
            tracing::debug!(container = %id.short(), attempt, "container running");
            return Ok(());
        }

        tracing::debug!(
            container = %id.short(),
            attempt,
            max_attempts = policy.max_attempts,
            state = %last_state,
            "container not ready yet"
        );

        if attempt < policy.max_attempts {
            pause(policy.interval, cancel).await?;
        }
    }

    Err(WaitError::TimedOut {
        container: id.clone(),
        attempts: policy.max_attempts,
        last_state,
    })
}

async fn pause(interval: Duration, cancel: &CancellationToken) -> Result<(), WaitError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}
