// ABOUTME: Errors raised by the SSH transport.
// ABOUTME: Connection, credential, host key, and command failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot reach {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("server rejected every offered key for user {user}")]
    AuthenticationFailed { user: String },

    #[error("no SSH credentials: {0}")]
    NoCredentials(String),

    #[error("failed to load key from {path}: {source}")]
    KeyLoad {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },

    #[error("could not run `{command}`: {reason}")]
    Exec { command: String, reason: String },

    #[error("`{command}` did not finish within {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("channel closed before `{0}` reported an exit status")]
    ChannelClosed(String),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
