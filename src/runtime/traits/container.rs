// ABOUTME: Container operations trait for the container engine.
// ABOUTME: Create, start, stop, remove, inspect, and list containers.

use super::shared_types::{ContainerConfig, ContainerInfo, ManagedContainer};
use crate::types::ContainerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, waiting up to `grace` before killing it.
    async fn stop_container(&self, id: &ContainerId, grace: Duration)
    -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Get detailed information about a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ManagedContainer>, ContainerError>;
}

/// Filters for listing containers. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Exact label matches (key=value).
    pub labels: HashMap<String, String>,
    /// Substring that the container's image reference must contain.
    pub image_contains: Option<String>,
    /// Exact container name.
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn image_contains(mut self, needle: impl Into<String>) -> Self {
        self.image_contains = Some(needle.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn include_stopped(mut self) -> Self {
        self.all = true;
        self
    }

    /// Whether a listed container satisfies these filters.
    ///
    /// Engines that cannot filter server-side (image substring) use this to
    /// narrow the result set.
    pub fn matches(&self, container: &ManagedContainer) -> bool {
        let labels_match = self
            .labels
            .iter()
            .all(|(k, v)| container.labels.get(k) == Some(v));
        let image_match = self
            .image_contains
            .as_deref()
            .is_none_or(|needle| container.image.contains(needle));
        let name_match = self
            .name
            .as_deref()
            .is_none_or(|name| container.name == name);
        let state_match = self.all || container.state.is_running();

        labels_match && image_match && name_match && state_match
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::traits::ContainerState;
    use crate::types::ImageId;

    fn listed(name: &str, image: &str, state: ContainerState) -> ManagedContainer {
        ManagedContainer {
            id: ContainerId::new(format!("id-{name}")),
            name: name.to_string(),
            image: image.to_string(),
            image_id: ImageId::new(format!("sha256:{image}")),
            state,
            labels: HashMap::new(),
        }
    }

    #[test]
    fn name_filter_is_exact() {
        let filters = ContainerFilters::default().named("bondi-proxy").include_stopped();
        assert!(filters.matches(&listed("bondi-proxy", "traefik:v3.3.0", ContainerState::Exited)));
        assert!(!filters.matches(&listed("bondi-proxy-old", "traefik:v3.3.0", ContainerState::Running)));
        assert!(!filters.matches(&listed("my-bondi-proxy", "traefik:v3.3.0", ContainerState::Running)));
    }

    #[test]
    fn set_filters_combine_with_and() {
        let filters = ContainerFilters::default()
            .named("bondi-proxy")
            .image_contains("traefik");
        assert!(filters.matches(&listed("bondi-proxy", "traefik:v3.3.0", ContainerState::Running)));
        assert!(!filters.matches(&listed("bondi-proxy", "nginx:1", ContainerState::Running)));
        assert!(!filters.matches(&listed("bondi-proxy", "traefik:v3.3.0", ContainerState::Exited)));
    }
}
