// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use super::request::ValidatedRequest;
use super::settings::DeploySettings;
use super::state::{Discovered, ImagePulled, Planned, Started};
use crate::runtime::ManagedContainer;
use crate::types::{ContainerId, ImageRef};

/// One service deployment on one host, parameterized by its current state.
///
/// Transitions consume the deployment and return the next state, so the
/// previous container can only be retired once the new image is on the host.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) request: ValidatedRequest,
    pub(crate) settings: DeploySettings,
    pub(crate) state: S,
}

impl Deployment<Planned> {
    pub fn new(request: ValidatedRequest, settings: DeploySettings) -> Self {
        Deployment {
            request,
            settings,
            state: Planned,
        }
    }
}

impl<S> Deployment<S> {
    pub fn image(&self) -> &ImageRef {
        self.request.image()
    }

    pub fn request(&self) -> &ValidatedRequest {
        &self.request
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }
}

impl Deployment<Discovered> {
    /// Service containers that will be replaced.
    pub fn previous(&self) -> &[ManagedContainer] {
        &self.state.previous
    }
}

impl Deployment<ImagePulled> {
    pub fn previous(&self) -> &[ManagedContainer] {
        &self.state.previous
    }
}

impl Deployment<Started> {
    pub fn container_id(&self) -> &ContainerId {
        &self.state.container
    }

    pub fn into_container_id(self) -> ContainerId {
        self.state.container
    }
}
