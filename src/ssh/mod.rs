// ABOUTME: SSH transport to deployment targets.
// ABOUTME: Sessions with known_hosts checking and remote exec.

mod auth;
mod client;
mod error;
mod exec;
mod host_keys;

pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use exec::CommandOutput;
