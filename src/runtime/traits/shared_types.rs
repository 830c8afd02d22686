// ABOUTME: Shared types used across the engine trait definitions.
// ABOUTME: ContainerConfig, ManagedContainer, ContainerState, RegistryAuth, etc.

use crate::types::{ContainerId, ImageId, ImageRef};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ImageRef,
    /// Environment as `KEY=VALUE` entries.
    pub env: Vec<String>,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Port mappings.
    pub ports: Vec<PortMapping>,
    /// Host bind mounts.
    pub mounts: Vec<BindMount>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
    /// Restart policy.
    pub restart_policy: RestartPolicyConfig,
    /// Network to attach to at creation.
    pub network: Option<String>,
}

/// Port mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Host port; `None` exposes the container port without publishing it.
    pub host_port: Option<u16>,
    /// Container port.
    pub container_port: u16,
    /// Protocol (tcp/udp).
    pub protocol: Protocol,
    /// Host IP to bind to.
    pub host_ip: Option<String>,
}

impl PortMapping {
    /// Publish `port/tcp` on the same host port on all interfaces.
    pub fn published_tcp(port: u16) -> Self {
        Self {
            host_port: Some(port),
            container_port: port,
            protocol: Protocol::Tcp,
            host_ip: Some("0.0.0.0".to_string()),
        }
    }

    /// The engine's port key, e.g. `8080/tcp`.
    pub fn port_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

/// Network protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// Host bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub source: String,
    /// Path in the container.
    pub target: String,
    pub read_only: bool,
}

impl BindMount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// Restart policy configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicyConfig {
    /// Never restart.
    No,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    #[default]
    UnlessStopped,
}

/// Lifecycle state of a container as reported by the engine.
///
/// `Absent` is never reported by the engine itself; it stands for "inspect
/// said no such container", which happens transiently right after creation
/// on slow storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Absent,
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    /// Map the engine's state string (`docker ps` / inspect) to a state.
    pub fn from_engine(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "dead" => ContainerState::Dead,
            // podman reports "empty" for a container whose storage is gone
            "" | "empty" => ContainerState::Absent,
            // "exited" and states this version does not know
            _ => ContainerState::Exited,
        }
    }

    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Absent => "absent",
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// A container as seen in a listing.
#[derive(Debug, Clone)]
pub struct ManagedContainer {
    /// Engine-assigned id.
    pub id: ContainerId,
    /// Container name without the leading slash.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Id of the backing image, used to remove it.
    pub image_id: ImageId,
    /// Current state.
    pub state: ContainerState,
    /// Labels.
    pub labels: HashMap<String, String>,
}

/// Detailed information about a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub image_id: ImageId,
    pub state: ContainerState,
    /// Creation timestamp as reported by the engine.
    pub created: String,
    pub restart_count: i64,
    pub labels: HashMap<String, String>,
}

/// Configuration for creating a network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name.
    pub name: String,
    /// Network driver (bridge, overlay, ...).
    pub driver: Option<String>,
    /// Labels.
    pub labels: HashMap<String, String>,
}

/// Registry authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    /// Registry server (e.g. "ghcr.io"); the engine infers it when absent.
    pub server: Option<String>,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}
