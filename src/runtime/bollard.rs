// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: Talks to the Docker Engine API over the host's Unix socket.

use crate::runtime::traits::{
    BindMount, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ImageError, ImageOps, ManagedContainer, NetworkConfig, NetworkError,
    NetworkOps, PortMapping, RegistryAuth, RestartPolicyConfig,
};
use crate::types::{ContainerId, ImageId, ImageRef, NetworkId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerStateStatusEnum, EndpointSettings, HostConfig, Mount,
    MountTypeEnum, NetworkingConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, InspectNetworkOptions,
    ListContainersOptions, RemoveContainerOptions, RemoveImageOptions, StartContainerOptions,
    StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Seconds bollard waits on a single API call.
const API_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn status_of(e: &BollardError) -> Option<(u16, &str)> {
    match e {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

fn map_image_pull_error(e: BollardError, image: &str) -> ImageError {
    match status_of(&e) {
        Some((401 | 403, _)) => ImageError::AuthenticationFailed(image.to_string()),
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        _ => ImageError::PullFailed(format!("{image}: {e}")),
    }
}

fn map_image_remove_error(e: BollardError, image: &str) -> ImageError {
    match status_of(&e) {
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        Some((409, message)) => ImageError::InUse(format!("{image}: {message}")),
        _ => ImageError::Runtime(format!("failed to remove {image}: {e}")),
    }
}

fn map_container_create_error(e: BollardError) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::ImageNotFound(message.to_string()),
        Some((409, message)) => ContainerError::AlreadyExists(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: BollardError) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((304, message)) => ContainerError::AlreadyRunning(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: BollardError, id: &ContainerId) -> ContainerError {
    match status_of(&e) {
        Some((404, _)) => ContainerError::NotFound(id.to_string()),
        Some((304, _)) => ContainerError::NotRunning(id.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: BollardError, id: &ContainerId) -> ContainerError {
    match status_of(&e) {
        Some((404, _)) => ContainerError::NotFound(id.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_network_create_error(e: BollardError, name: &str) -> NetworkError {
    match status_of(&e) {
        Some((409, _)) => NetworkError::AlreadyExists(name.to_string()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn state_from_status(status: ContainerStateStatusEnum) -> ContainerState {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerState::Created,
        ContainerStateStatusEnum::RUNNING => ContainerState::Running,
        ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
        ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
        ContainerStateStatusEnum::DEAD => ContainerState::Dead,
        ContainerStateStatusEnum::EMPTY => ContainerState::Absent,
        _ => ContainerState::Exited,
    }
}

// =============================================================================
// Request Builders
// =============================================================================

fn restart_policy(policy: RestartPolicyConfig) -> RestartPolicy {
    let name = match policy {
        RestartPolicyConfig::No => RestartPolicyNameEnum::NO,
        RestartPolicyConfig::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicyConfig::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
    };
    RestartPolicy {
        name: Some(name),
        maximum_retry_count: None,
    }
}

fn bind_mount(mount: &BindMount) -> Mount {
    Mount {
        source: Some(mount.source.clone()),
        target: Some(mount.target.clone()),
        typ: Some(MountTypeEnum::BIND),
        read_only: Some(mount.read_only),
        ..Default::default()
    }
}

type PortBindings = HashMap<String, Option<Vec<PortBinding>>>;

fn port_bindings(ports: &[PortMapping]) -> (Vec<String>, PortBindings) {
    let mut exposed = Vec::new();
    let mut bindings = HashMap::new();
    for port in ports {
        let key = port.port_key();
        exposed.push(key.clone());
        if let Some(host_port) = port.host_port {
            bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: port.host_ip.clone(),
                    host_port: Some(host_port.to_string()),
                }]),
            );
        }
    }
    (exposed, bindings)
}

fn create_body(config: &ContainerConfig) -> ContainerCreateBody {
    let (exposed_ports, port_bindings) = port_bindings(&config.ports);
    let mounts: Vec<Mount> = config.mounts.iter().map(bind_mount).collect();

    let host_config = HostConfig {
        restart_policy: Some(restart_policy(config.restart_policy)),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        mounts: (!mounts.is_empty()).then_some(mounts),
        network_mode: config.network.clone(),
        ..Default::default()
    };

    let networking_config = config.network.as_ref().map(|network| NetworkingConfig {
        endpoints_config: Some(HashMap::from([(
            network.clone(),
            EndpointSettings::default(),
        )])),
    });

    ContainerCreateBody {
        image: Some(config.image.to_string()),
        env: (!config.env.is_empty()).then(|| config.env.clone()),
        labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
        cmd: config.command.clone(),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        networking_config,
        ..Default::default()
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container engine implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to an engine socket on this machine.
    pub fn connect_unix(socket_path: &str) -> Result<Self, ContainerError> {
        let client =
            Docker::connect_with_unix(socket_path, API_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(|e| ContainerError::Runtime(format!("{socket_path}: {e}")))?;
        Ok(Self::new(client))
    }

    /// Check that the engine answers.
    pub async fn ping(&self) -> Result<(), ContainerError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| ContainerError::Runtime(e.to_string()))
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let image = reference.to_string();
        let tag = if reference.has_tag() {
            reference.tag()
        } else {
            "latest"
        };

        let opts = CreateImageOptions {
            from_image: Some(reference.name().to_string()),
            tag: Some(tag.to_string()),
            ..Default::default()
        };

        let credentials = auth.map(|a| bollard::auth::DockerCredentials {
            username: Some(a.username.clone()),
            password: Some(a.password.clone()),
            serveraddress: a.server.clone(),
            ..Default::default()
        });

        // The pull only completes once the progress stream is drained.
        let mut stream = self.client.create_image(Some(opts), None, credentials);
        while let Some(progress) = stream.next().await {
            let progress = progress.map_err(|e| map_image_pull_error(e, &image))?;
            if let Some(status) = progress.status {
                tracing::trace!(image = %image, "{}", status);
            }
        }

        Ok(())
    }

    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError> {
        let image = reference.to_string();
        match self.client.inspect_image(&image).await {
            Ok(details) => Ok(details.id.map(ImageId::new)),
            Err(e) if matches!(status_of(&e), Some((404, _))) => Ok(None),
            Err(e) => Err(ImageError::Runtime(format!("failed to inspect {image}: {e}"))),
        }
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            noprune: false,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, id.as_str()))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let opts = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), create_body(config))
            .await
            .map_err(map_container_create_error)?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        grace: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(stop_timeout_secs(grace)),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| map_container_stop_error(e, id))
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| map_container_not_found_error(e, id))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_container_not_found_error(e, id))?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(state_from_status)
            .unwrap_or(ContainerState::Absent);

        let config = details.config.unwrap_or_default();

        Ok(ContainerInfo {
            id: id.clone(),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.image.unwrap_or_default(),
            image_id: ImageId::new(details.image.unwrap_or_default()),
            state,
            created: details.created.map(|dt| dt.to_string()).unwrap_or_default(),
            restart_count: details.restart_count.unwrap_or_default(),
            labels: config.labels.unwrap_or_default(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ManagedContainer>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{key}={value}"));
        }
        if let Some(name) = &filters.name {
            // The engine treats this as a regex over "/name".
            filter_map
                .entry("name".to_string())
                .or_default()
                .push(format!("^/{name}$"));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| ContainerError::Runtime(format!("failed to list containers: {e}")))?;

        // Image substring matching has no engine-side filter.
        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let state = c
                    .state
                    .map(|s| ContainerState::from_engine(&format!("{s:?}")))
                    .unwrap_or(ContainerState::Absent);

                ManagedContainer {
                    id: ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    image: c.image.unwrap_or_default(),
                    image_id: ImageId::new(c.image_id.unwrap_or_default()),
                    state,
                    labels: c.labels.unwrap_or_default(),
                }
            })
            .filter(|c| filters.matches(c))
            .collect())
    }
}

#[async_trait]
impl NetworkOps for BollardRuntime {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError> {
        let request = bollard::models::NetworkCreateRequest {
            name: config.name.clone(),
            driver: config.driver.clone(),
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_network(request)
            .await
            .map_err(|e| map_network_create_error(e, &config.name))?;

        Ok(NetworkId::new(response.id))
    }

    async fn network_exists(&self, name: &str) -> Result<bool, NetworkError> {
        match self
            .client
            .inspect_network(name, None::<InspectNetworkOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if matches!(status_of(&e), Some((404, _))) => Ok(false),
            Err(e) => Err(NetworkError::Runtime(e.to_string())),
        }
    }
}

/// The engine takes the stop timeout as an `i32` number of seconds.
fn stop_timeout_secs(grace: Duration) -> i32 {
    i32::try_from(grace.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_timeout_saturates_instead_of_wrapping() {
        assert_eq!(stop_timeout_secs(Duration::from_secs(10)), 10);
        assert_eq!(stop_timeout_secs(Duration::from_millis(1500)), 1);
        assert_eq!(stop_timeout_secs(Duration::from_secs(u64::MAX)), i32::MAX);
        assert_eq!(
            stop_timeout_secs(Duration::from_secs(i32::MAX as u64 + 1)),
            i32::MAX
        );
    }

    fn sample_config() -> ContainerConfig {
        ContainerConfig {
            name: "bondi-service".to_string(),
            image: ImageRef::new("ghcr.io/acme/app", "v1"),
            env: vec!["ENV=prod".to_string()],
            labels: HashMap::from([("bondi.managed".to_string(), "true".to_string())]),
            ports: vec![PortMapping::published_tcp(8080)],
            mounts: vec![BindMount::new("/var/run/docker.sock", "/var/run/docker.sock")],
            command: None,
            restart_policy: RestartPolicyConfig::UnlessStopped,
            network: Some("bondi-network".to_string()),
        }
    }

    #[test]
    fn create_body_publishes_ports() {
        let body = create_body(&sample_config());
        assert_eq!(body.exposed_ports, Some(vec!["8080/tcp".to_string()]));

        let bindings = body.host_config.unwrap().port_bindings.unwrap();
        let binding = &bindings["8080/tcp"].as_ref().unwrap()[0];
        assert_eq!(binding.host_port.as_deref(), Some("8080"));
        assert_eq!(binding.host_ip.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn create_body_attaches_network() {
        let body = create_body(&sample_config());
        let endpoints = body.networking_config.unwrap().endpoints_config.unwrap();
        assert!(endpoints.contains_key("bondi-network"));
    }

    #[test]
    fn create_body_without_network_has_no_endpoints() {
        let mut config = sample_config();
        config.network = None;
        let body = create_body(&config);
        assert!(body.networking_config.is_none());
        assert!(body.host_config.unwrap().network_mode.is_none());
    }

    #[test]
    fn create_body_carries_image_env_and_mounts() {
        let body = create_body(&sample_config());
        assert_eq!(body.image.as_deref(), Some("ghcr.io/acme/app:v1"));
        assert_eq!(body.env, Some(vec!["ENV=prod".to_string()]));
        let mounts = body.host_config.unwrap().mounts.unwrap();
        assert_eq!(mounts[0].typ, Some(MountTypeEnum::BIND));
    }
}
