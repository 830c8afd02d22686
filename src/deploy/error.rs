// ABOUTME: Deployment errors with SNAFU context selectors.
// ABOUTME: Every variant names the step and the subject it failed on.

use serde::{Deserialize, Serialize};
use snafu::Snafu;

use super::readiness::WaitError;
use crate::runtime::{ContainerError, ImageError, NetworkError};
use crate::types::{ContainerId, ImageId, ParseImageRefError};

/// A deployment run's terminal failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeployError {
    #[snafu(display("invalid deploy request: {reason}"))]
    InvalidRequest { reason: String },

    #[snafu(display("reverse proxy settings incomplete, missing: {}", missing.join(", ")))]
    IncompleteProxy { missing: Vec<&'static str> },

    #[snafu(display("invalid proxy image {image}: {source}"))]
    InvalidProxyImage {
        image: String,
        source: ParseImageRefError,
    },

    #[snafu(display("proxy image {image} must carry a tag"))]
    UntaggedProxyImage { image: String },

    #[snafu(display("failed to list containers for {subject}: {source}"))]
    ListContainers {
        subject: String,
        source: ContainerError,
    },

    #[snafu(display("failed to look up network {network}: {source}"))]
    InspectNetwork {
        network: String,
        source: NetworkError,
    },

    #[snafu(display("failed to create network {network}: {source}"))]
    CreateNetwork {
        network: String,
        source: NetworkError,
    },

    #[snafu(display("failed to pull image {image}: {source}"))]
    PullImage { image: String, source: ImageError },

    #[snafu(display("failed to resolve pulled image {image}: {source}"))]
    ResolveImage { image: String, source: ImageError },

    #[snafu(display("failed to stop container {container}: {source}"))]
    StopContainer {
        container: ContainerId,
        source: ContainerError,
    },

    #[snafu(display("failed to remove container {container}: {source}"))]
    RemoveContainer {
        container: ContainerId,
        source: ContainerError,
    },

    #[snafu(display("failed to remove image {image}: {source}"))]
    RemoveImage { image: ImageId, source: ImageError },

    #[snafu(display("failed to create container {name}: {source}"))]
    CreateContainer {
        name: String,
        source: ContainerError,
    },

    #[snafu(display("failed to start container {container}: {source}"))]
    StartContainer {
        container: ContainerId,
        source: ContainerError,
    },

    #[snafu(display("reverse proxy {container} not ready: {source}"))]
    ProxyNotReady {
        container: ContainerId,
        source: WaitError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployErrorKind {
    /// Listing or inspecting containers or networks failed.
    Discovery,
    /// The request was rejected before touching the engine.
    Precondition,
    /// Pulling or resolving the image failed.
    Pull,
    /// Stop, remove, create, start, or network creation failed.
    Lifecycle,
    /// The proxy timed out or the wait was cancelled.
    Readiness,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::InvalidRequest { .. }
            | DeployError::IncompleteProxy { .. }
            | DeployError::InvalidProxyImage { .. }
            | DeployError::UntaggedProxyImage { .. } => DeployErrorKind::Precondition,
            DeployError::ListContainers { .. }
            | DeployError::InspectNetwork { .. }
            | DeployError::ProxyNotReady {
                source: WaitError::Inspect { .. },
                ..
            } => DeployErrorKind::Discovery,
            DeployError::PullImage { .. } | DeployError::ResolveImage { .. } => {
                DeployErrorKind::Pull
            }
            DeployError::CreateNetwork { .. }
            | DeployError::StopContainer { .. }
            | DeployError::RemoveContainer { .. }
            | DeployError::RemoveImage { .. }
            | DeployError::CreateContainer { .. }
            | DeployError::StartContainer { .. } => DeployErrorKind::Lifecycle,
            DeployError::ProxyNotReady { .. } => DeployErrorKind::Readiness,
        }
    }

    /// Whether the run was stopped by the caller rather than by a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            DeployError::ProxyNotReady {
                source: WaitError::Cancelled,
                ..
            }
        )
    }
}
