// ABOUTME: One complete deployment run against a single host.
// ABOUTME: Proxy bootstrap and readiness, then the service type-state chain.

use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

use super::Deployment;
use super::error::{DeployError, ProxyNotReadySnafu};
use super::proxy::{ReverseProxySpec, ensure_proxy};
use super::readiness::wait_until_running;
use super::request::DeployRequest;
use super::settings::DeploySettings;
use super::transitions::ensure_network;
use crate::runtime::Engine;
use crate::types::ContainerId;

/// Id of the new service container, or the step that failed.
pub type DeploymentResult = Result<ContainerId, DeployError>;

/// Deploy `request` on the host behind `engine`.
///
/// Safe to repeat: a run interrupted at any step is converged by the next one.
/// The request is validated before the engine is touched. `cancel` aborts the
/// wait for the reverse proxy.
pub async fn deploy<E: Engine + ?Sized>(
    engine: &E,
    settings: &DeploySettings,
    request: &DeployRequest,
    cancel: &CancellationToken,
) -> DeploymentResult {
    let request = request.validate()?;

    if let Some(proxy) = request.proxy() {
        let network = ensure_network(engine, &settings.network).await?;
        tracing::debug!(network = %network.name, created = network.created, "network ready");

        let spec = ReverseProxySpec::build(proxy, settings);
        let proxy_id = ensure_proxy(engine, &spec).await?;
        wait_until_running(engine, &proxy_id, settings.readiness, cancel)
            .await
            .context(ProxyNotReadySnafu {
                container: proxy_id.clone(),
            })?;
        tracing::info!(container = %proxy_id.short(), "reverse proxy running");
    }

    let deployment = Deployment::new(request, settings.clone())
        .discover(engine)
        .await?
        .pull_image(engine)
        .await?
        .retire_previous(engine)
        .await?
        .start_container(engine)
        .await?;

    Ok(deployment.into_container_id())
}
