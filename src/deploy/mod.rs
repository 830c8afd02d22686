// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Proxy bootstrap, readiness waiting, service replacement, and status.

mod deployment;
mod error;
pub mod labels;
mod orchestrate;
mod proxy;
mod readiness;
mod request;
mod settings;
mod state;
mod status;
mod transitions;

pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use orchestrate::{DeploymentResult, deploy};
pub use proxy::{ReverseProxySpec, ensure_proxy};
pub use readiness::{WaitError, wait_until_running};
pub use request::{DeployRequest, ProxyParams, ValidatedRequest};
pub use settings::{DeploySettings, ReadinessPolicy};
pub use state::{Discovered, ImagePulled, Planned, Retired, Started};
pub use status::{ServiceStatus, StatusError, named_service_status, service_status};
pub use transitions::{NetworkHandle, ensure_network};
