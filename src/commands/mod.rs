// ABOUTME: Command module aggregator for the bondi CLI.
// ABOUTME: Re-exports the deploy, docker, setup, and status command handlers.

mod deploy;
mod docker;
mod session;
mod setup;
mod status;

pub use deploy::deploy;
pub use docker::{docker_logs, docker_ps};
pub use setup::setup;
pub use status::status;
