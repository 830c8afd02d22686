// ABOUTME: Image operations trait for the container engine.
// ABOUTME: Pull, resolve, and remove container images.

use super::shared_types::RegistryAuth;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

/// Image operations: pull, resolve to an id, remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Pull an image from a registry. `None` pulls anonymously.
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError>;

    /// Resolve a local image reference to its id, `None` if not present.
    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError>;

    /// Remove an image by id.
    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("authentication failed for image: {0}")]
    AuthenticationFailed(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
