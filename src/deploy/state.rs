// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Each state carries the data the next transition needs.

use crate::runtime::ManagedContainer;
use crate::types::{ContainerId, ImageId};

/// Request validated, nothing looked at yet.
/// Available actions: `discover()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Previous service containers found.
/// Available actions: `pull_image()`
#[derive(Debug, Clone)]
pub struct Discovered {
    pub(crate) previous: Vec<ManagedContainer>,
}

/// New image present on the host; nothing destroyed yet.
/// Available actions: `retire_previous()`
#[derive(Debug, Clone)]
pub struct ImagePulled {
    pub(crate) previous: Vec<ManagedContainer>,
    /// Id of the pulled image, when the engine could resolve it.
    pub(crate) image_id: Option<ImageId>,
}

/// Previous containers and their images removed.
/// Available actions: `start_container()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Retired;

/// New service container created and started.
#[derive(Debug, Clone)]
pub struct Started {
    pub(crate) container: ContainerId,
}
