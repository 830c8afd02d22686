// ABOUTME: Read-only status report of the deployed service container.
// ABOUTME: Finds it by identity label or name and summarizes its inspect data.

use serde::{Deserialize, Serialize};

use super::labels;
use crate::runtime::{ContainerError, ContainerFilters, ContainerOps};
use crate::types::{ImageRef, ParseImageRefError};

/// What `bondi status` reports for a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub image_name: String,
    pub tag: String,
    pub created_at: String,
    pub restart_count: i64,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("no service container found for {subject}")]
    NotFound { subject: String },

    #[error("service container has an unusable image reference {reference}: {source}")]
    ImageRef {
        reference: String,
        #[source]
        source: ParseImageRefError,
    },

    #[error(transparent)]
    Engine(#[from] ContainerError),
}

/// Report on the service container deployed for `image_name`.
///
/// When leftovers exist next to the current container, the running one wins.
pub async fn service_status<R: ContainerOps + ?Sized>(
    runtime: &R,
    image_name: &str,
) -> Result<ServiceStatus, StatusError> {
    report(runtime, &labels::service_filter(image_name), image_name).await
}

/// Report on whatever runs under the service container name.
pub async fn named_service_status<R: ContainerOps + ?Sized>(
    runtime: &R,
    container_name: &str,
) -> Result<ServiceStatus, StatusError> {
    let filters = ContainerFilters::default()
        .named(container_name)
        .include_stopped();
    report(runtime, &filters, container_name).await
}

async fn report<R: ContainerOps + ?Sized>(
    runtime: &R,
    filters: &ContainerFilters,
    subject: &str,
) -> Result<ServiceStatus, StatusError> {
    let containers = runtime.list_containers(filters).await?;

    let container = containers
        .iter()
        .find(|c| c.state.is_running())
        .or_else(|| containers.first())
        .ok_or_else(|| StatusError::NotFound {
            subject: subject.to_string(),
        })?;

    let info = runtime.inspect_container(&container.id).await?;
    let image = ImageRef::parse(&info.image).map_err(|source| StatusError::ImageRef {
        reference: info.image.clone(),
        source,
    })?;

    Ok(ServiceStatus {
        image_name: image.name().to_string(),
        tag: image.tag().to_string(),
        created_at: info.created,
        restart_count: info.restart_count,
        status: info.state.to_string(),
    })
}
