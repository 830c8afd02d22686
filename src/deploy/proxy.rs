// ABOUTME: Reverse proxy (Traefik) container spec and bootstrapper.
// ABOUTME: Replaces a proxy running another version, otherwise reuses it.

use snafu::ResultExt;
use std::collections::HashMap;
use std::time::Duration;

use super::error::{CreateContainerSnafu, DeployError, PullImageSnafu, StartContainerSnafu};
use super::labels;
use super::request::ProxyParams;
use super::settings::DeploySettings;
use super::transitions::{list_any, retire_container};
use crate::runtime::{
    BindMount, ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ImageOps,
    ManagedContainer, PortMapping, RestartPolicyConfig,
};
use crate::types::{ContainerId, ImageRef};

/// Image name fragment shared by every proxy version, whatever the registry.
pub const PROXY_FAMILY: &str = "traefik";

/// Everything needed to run the reverse proxy on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseProxySpec {
    pub container_name: String,
    pub image: ImageRef,
    pub network: String,
    pub ports: Vec<PortMapping>,
    pub args: Vec<String>,
    pub mounts: Vec<BindMount>,
    pub labels: HashMap<String, String>,
    /// Grace period when stopping an outdated proxy.
    pub stop_grace: Duration,
}

impl ReverseProxySpec {
    pub fn build(params: &ProxyParams, settings: &DeploySettings) -> Self {
        let resolver = format!("--certificatesResolvers.{}.acme", settings.cert_resolver);
        let args = vec![
            "--providers.docker".to_string(),
            "--providers.docker.exposedbydefault=false".to_string(),
            "--entrypoints.web.address=:80".to_string(),
            "--entrypoints.web.http.redirections.entryPoint.to=websecure".to_string(),
            "--entrypoints.web.http.redirections.entryPoint.scheme=https".to_string(),
            "--entrypoints.websecure.address=:443".to_string(),
            format!("{resolver}.email={}", params.acme_email()),
            format!("{resolver}.storage={}", settings.acme_storage_path),
            format!("{resolver}.tlsChallenge=true"),
        ];

        Self {
            container_name: settings.proxy_container.clone(),
            image: params.image().clone(),
            network: settings.network.clone(),
            ports: vec![PortMapping::published_tcp(80), PortMapping::published_tcp(443)],
            args,
            mounts: vec![
                BindMount::new(&settings.engine_socket, &settings.engine_socket),
                BindMount::new(&settings.acme_host_path, &settings.acme_storage_path),
            ],
            labels: labels::proxy_identity(),
            stop_grace: settings.stop_grace,
        }
    }

    /// Listings that together find every proxy container on the host.
    ///
    /// A proxy started from another registry path than the requested one is
    /// still found through its role label or its container name.
    pub fn discovery_filters(&self) -> [ContainerFilters; 3] {
        [
            labels::proxy_filter(),
            ContainerFilters::default()
                .image_contains(PROXY_FAMILY)
                .include_stopped(),
            ContainerFilters::default()
                .named(&self.container_name)
                .include_stopped(),
        ]
    }

    pub fn container_config(&self) -> ContainerConfig {
        ContainerConfig {
            name: self.container_name.clone(),
            image: self.image.clone(),
            env: Vec::new(),
            labels: self.labels.clone(),
            ports: self.ports.clone(),
            mounts: self.mounts.clone(),
            command: Some(self.args.clone()),
            restart_policy: RestartPolicyConfig::UnlessStopped,
            network: Some(self.network.clone()),
        }
    }

    /// Whether `container` runs the wanted proxy version.
    fn is_current(&self, container: &ManagedContainer) -> bool {
        match ImageRef::parse(&container.image) {
            Ok(image) => image == self.image,
            Err(e) => {
                tracing::warn!(
                    container = %container.id.short(),
                    image = %container.image,
                    error = %e,
                    "cannot parse proxy image, replacing it"
                );
                false
            }
        }
    }
}

/// Make sure exactly one proxy of the wanted version exists and is started.
///
/// Returns the id of the proxy container, unchanged when the existing one
/// already runs the wanted image.
pub async fn ensure_proxy<R>(runtime: &R, spec: &ReverseProxySpec) -> Result<ContainerId, DeployError>
where
    R: ContainerOps + ImageOps + ?Sized,
{
    let found = list_any(runtime, &spec.discovery_filters(), PROXY_FAMILY).await?;

    // Service containers whose image merely contains the family name are not proxies.
    let (mut current, stale): (Vec<_>, Vec<_>) = found
        .into_iter()
        .filter(|c| !c.labels.contains_key(labels::SERVICE))
        .partition(|c| spec.is_current(c));

    let keep = (!current.is_empty()).then(|| current.remove(0));
    let keep_image = keep.as_ref().map(|c| &c.image_id);

    for container in stale.iter().chain(current.iter()) {
        tracing::info!(
            container = %container.id.short(),
            image = %container.image,
            wanted = %spec.image,
            "replacing proxy container"
        );
        retire_container(runtime, container, spec.stop_grace, keep_image).await?;
    }

    if let Some(existing) = keep {
        if !existing.state.is_running() {
            tracing::info!(container = %existing.id.short(), state = %existing.state, "starting stopped proxy");
            match runtime.start_container(&existing.id).await {
                Ok(()) | Err(ContainerError::AlreadyRunning(_)) => {}
                Err(source) => {
                    return Err(source).context(StartContainerSnafu {
                        container: existing.id.clone(),
                    });
                }
            }
        }
        return Ok(existing.id);
    }

    let image = spec.image.to_string();
    tracing::info!(image = %image, "pulling proxy image");
    runtime
        .pull_image(&spec.image, None)
        .await
        .context(PullImageSnafu { image: &image })?;

    let config = spec.container_config();
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

    tracing::info!(container = %container.short(), image = %image, "started proxy");
    Ok(container)
}
