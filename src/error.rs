// ABOUTME: Application-wide error types for bondi.
// ABOUTME: Wraps every subsystem error for the CLI.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{host}: {source}")]
    Agent {
        host: String,
        #[source]
        source: crate::agent::AgentError,
    },

    #[error("{host}: deployment cancelled")]
    Cancelled { host: String },

    #[error("{host}: {command} exited with code {code}")]
    RemoteCommand {
        host: String,
        command: String,
        code: u32,
    },

    #[error(transparent)]
    Provision(#[from] crate::provision::ProvisionError),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("container engine error: {0}")]
    Engine(#[from] crate::runtime::ContainerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
