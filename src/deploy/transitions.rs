// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use snafu::ResultExt;
use std::collections::{HashMap, HashSet};

use crate::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ImageError, ImageOps, ManagedContainer,
    NetworkConfig, NetworkError, NetworkOps, PortMapping, RestartPolicyConfig,
};
use crate::types::ImageId;

use super::Deployment;
use super::error::{
    CreateContainerSnafu, CreateNetworkSnafu, DeployError, InspectNetworkSnafu,
    ListContainersSnafu, PullImageSnafu,
    RemoveContainerSnafu, RemoveImageSnafu, ResolveImageSnafu, StartContainerSnafu,
    StopContainerSnafu,
};
use super::labels;
use super::state::{Discovered, ImagePulled, Planned, Retired, Started};

/// The shared network and whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandle {
    pub name: String,
    pub created: bool,
}

/// Ensure the network exists, creating it if necessary.
///
/// A concurrent creation between the check and the create counts as success.
pub async fn ensure_network<R: NetworkOps + ?Sized>(
    runtime: &R,
    name: &str,
) -> Result<NetworkHandle, DeployError> {
    let exists = runtime
        .network_exists(name)
        .await
        .context(InspectNetworkSnafu { network: name })?;
    if exists {
        return Ok(NetworkHandle {
            name: name.to_string(),
            created: false,
        });
    }

    let config = NetworkConfig {
        name: name.to_string(),
        driver: Some("bridge".to_string()),
        labels: HashMap::from([(labels::MANAGED.to_string(), "true".to_string())]),
    };

    let created = match runtime.create_network(&config).await {
        Ok(id) => {
            tracing::info!(network = name, id = %id.short(), "created network");
            true
        }
        Err(NetworkError::AlreadyExists(_)) => false,
        Err(source) => return Err(source).context(CreateNetworkSnafu { network: name }),
    };

    Ok(NetworkHandle {
        name: name.to_string(),
        created,
    })
}

/// Containers matching any of `filters`, each listed once.
pub(crate) async fn list_any<R: ContainerOps + ?Sized>(
    runtime: &R,
    filters: &[ContainerFilters],
    subject: &str,
) -> Result<Vec<ManagedContainer>, DeployError> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for filter in filters {
        let listed = runtime
            .list_containers(filter)
            .await
            .context(ListContainersSnafu { subject })?;
        for container in listed {
            if seen.insert(container.id.clone()) {
                found.push(container);
            }
        }
    }
    Ok(found)
}

/// Stop and remove `container`, then its image unless it is `keep`.
///
/// An already stopped container and an already removed image are not errors.
pub(crate) async fn retire_container<R>(
    runtime: &R,
    container: &ManagedContainer,
    grace: std::time::Duration,
    keep: Option<&ImageId>,
) -> Result<(), DeployError>
where
    R: ContainerOps + ImageOps + ?Sized,
{
    let id = &container.id;

    match runtime.stop_container(id, grace).await {
        Ok(()) | Err(ContainerError::NotRunning(_)) => {}
        Err(source) => {
            return Err(source).context(StopContainerSnafu {
                container: id.clone(),
            });
        }
    }

    runtime
        .remove_container(id, true)
        .await
        .context(RemoveContainerSnafu {
            container: id.clone(),
        })?;
    tracing::info!(container = %id.short(), name = %container.name, "removed container");

    let image = &container.image_id;
    if image.as_str().is_empty() || keep == Some(image) {
        tracing::debug!(image = %image, "keeping image");
        return Ok(());
    }

    match runtime.remove_image(image, true).await {
        Ok(()) => tracing::info!(image = %image.short(), "removed image"),
        Err(ImageError::NotFound(_)) => {
            tracing::debug!(image = %image.short(), "image already gone");
        }
        Err(source) => {
            return Err(source).context(RemoveImageSnafu {
                image: image.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Planned -> Discovered
// =============================================================================

impl Deployment<Planned> {
    /// Find every container previously deployed for this image, stopped ones
    /// included, plus whatever occupies the service container name.
    ///
    /// The name holder may run another image (the service was switched to a
    /// new repository); it has to go or the new container cannot be created.
    #[must_use = "deployment state must be used"]
    pub async fn discover<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
    ) -> Result<Deployment<Discovered>, DeployError> {
        let image_name = self.image().name();
        let filters = [
            labels::service_filter(image_name),
            ContainerFilters::default()
                .named(&self.settings.service_container)
                .include_stopped(),
        ];
        let previous: Vec<_> = list_any(runtime, &filters, image_name)
            .await?
            .into_iter()
            .filter(|c| !labels::is_proxy(&c.labels))
            .collect();

        tracing::info!(
            image = image_name,
            found = previous.len(),
            "discovered previous service containers"
        );

        Ok(Deployment {
            request: self.request,
            settings: self.settings,
            state: Discovered { previous },
        })
    }
}

// =============================================================================
// Discovered -> ImagePulled
// =============================================================================

impl Deployment<Discovered> {
    /// Pull the new image. Nothing on the host is destroyed before this
    /// succeeds.
    #[must_use = "deployment state must be used"]
    pub async fn pull_image<R: ImageOps + ?Sized>(
        self,
        runtime: &R,
    ) -> Result<Deployment<ImagePulled>, DeployError> {
        let image = self.request.image();
        let image_str = image.to_string();

        tracing::info!(image = %image_str, "pulling image");
        runtime
            .pull_image(image, self.request.auth())
            .await
            .context(PullImageSnafu { image: &image_str })?;

        let image_id = runtime
            .image_id(image)
            .await
            .context(ResolveImageSnafu { image: &image_str })?;

        Ok(Deployment {
            request: self.request,
            settings: self.settings,
            state: ImagePulled {
                previous: self.state.previous,
                image_id,
            },
        })
    }
}

// =============================================================================
// ImagePulled -> Retired
// =============================================================================

impl Deployment<ImagePulled> {
    /// Stop and remove the previous containers and their images.
    ///
    /// The freshly pulled image is never removed, even when a previous
    /// container ran the same tag.
    #[must_use = "deployment state must be used"]
    pub async fn retire_previous<R>(self, runtime: &R) -> Result<Deployment<Retired>, DeployError>
    where
        R: ContainerOps + ImageOps + ?Sized,
    {
        let keep = self.state.image_id.as_ref();
        for container in &self.state.previous {
            retire_container(runtime, container, self.settings.stop_grace, keep).await?;
        }

        Ok(Deployment {
            request: self.request,
            settings: self.settings,
            state: Retired,
        })
    }
}

// =============================================================================
// Retired -> Started
// =============================================================================

impl Deployment<Retired> {
    /// Create and start the new service container.
    ///
    /// A container that fails to start is left in place; the next run
    /// discovers and replaces it.
    #[must_use = "deployment state must be used"]
    pub async fn start_container<R: ContainerOps + ?Sized>(
        self,
        runtime: &R,
    ) -> Result<Deployment<Started>, DeployError> {
        let config = self.container_config();

        let container = runtime
            .create_container(&config)
            .await
            .context(CreateContainerSnafu { name: &config.name })?;

        runtime
            .start_container(&container)
            .await
            .context(StartContainerSnafu {
                container: container.clone(),
            })?;

        tracing::info!(
            container = %container.short(),
            image = %config.image,
            "started service container"
        );

        Ok(Deployment {
            request: self.request,
            settings: self.settings,
            state: Started { container },
        })
    }

    /// Build the service container configuration.
    pub fn container_config(&self) -> ContainerConfig {
        let image = self.request.image();
        let mut labels = labels::service_identity(image.name());

        let network = self.request.proxy().map(|proxy| {
            labels.extend(labels::routing(
                proxy.domain(),
                &self.settings.cert_resolver,
            ));
            self.settings.network.clone()
        });

        ContainerConfig {
            name: self.settings.service_container.clone(),
            image: image.clone(),
            env: self.request.env().to_vec(),
            labels,
            ports: vec![PortMapping::published_tcp(self.request.port())],
            mounts: Vec::new(),
            command: None,
            restart_policy: RestartPolicyConfig::UnlessStopped,
            network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{DeployRequest, DeploySettings};

    fn retired(request: DeployRequest) -> Deployment<Retired> {
        Deployment {
            request: request.validate().unwrap(),
            settings: DeploySettings::default(),
            state: Retired,
        }
    }

    fn request() -> DeployRequest {
        DeployRequest {
            image_name: "ghcr.io/acme/app".to_string(),
            tag: "v1".to_string(),
            port: 8080,
            ..Default::default()
        }
    }

    #[test]
    fn service_config_without_proxy() {
        let config = retired(request()).container_config();
        assert_eq!(config.name, "bondi-service");
        assert_eq!(config.image.to_string(), "ghcr.io/acme/app:v1");
        assert_eq!(config.ports, vec![PortMapping::published_tcp(8080)]);
        assert_eq!(config.restart_policy, RestartPolicyConfig::UnlessStopped);
        assert!(config.network.is_none());
        assert!(!config.labels.contains_key("traefik.enable"));
        assert_eq!(config.labels[labels::SERVICE], "ghcr.io/acme/app");
    }

    #[test]
    fn service_config_with_proxy_routes_and_joins_network() {
        let mut req = request();
        req.proxy_domain_name = Some("example.com".to_string());
        req.proxy_image = Some("traefik:v3.3.0".to_string());
        req.proxy_acme_email = Some("ops@example.com".to_string());

        let config = retired(req).container_config();
        assert_eq!(config.network.as_deref(), Some("bondi-network"));
        assert_eq!(config.labels["traefik.enable"], "true");
        assert_eq!(
            config.labels["traefik.http.routers.bondi.entrypoints"],
            "websecure"
        );
        assert_eq!(config.labels[labels::MANAGED], "true");
    }
}
