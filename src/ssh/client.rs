// ABOUTME: SSH session to one server, built on russh.
// ABOUTME: Connects, authenticates, and runs commands.

use super::auth;
use super::error::{Error, Result};
use super::exec::{self, CommandOutput};
use super::host_keys::HostKeyPolicy;
use russh::Disconnect;
use russh::client::{self, Handle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Connection parameters for one server.
#[derive(Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key to use. Without one the agent and then `~/.ssh` keys are tried.
    pub key_path: Option<PathBuf>,
    pub key_passphrase: Option<String>,
    /// Accept and record host keys missing from known_hosts.
    pub trust_on_first_use: bool,
    /// Alternative known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            key_passphrase: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(600),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.key_passphrase = Some(passphrase.into());
        self
    }

    pub fn trust_on_first_use(mut self, trust: bool) -> Self {
        self.trust_on_first_use = trust;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("key_path", &self.key_path)
            .field("key_passphrase", &self.key_passphrase.as_ref().map(|_| "<redacted>"))
            .field("trust_on_first_use", &self.trust_on_first_use)
            .field("known_hosts_path", &self.known_hosts_path)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

/// An authenticated SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyPolicy>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credential =
            auth::resolve(config.key_path.as_deref(), config.key_passphrase.as_deref()).await?;

        let policy = HostKeyPolicy::new(
            config.host.clone(),
            config.port,
            config.trust_on_first_use,
            config.known_hosts_path.clone(),
        );
        let russh_config = client::Config {
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            policy,
        )
        .await
        .map_err(|e| Error::Connect {
            host: config.host.clone(),
            port: config.port,
            reason: e.to_string(),
        })?;

        if !auth::authenticate(&mut handle, &config.user, credential).await? {
            return Err(Error::AuthenticationFailed {
                user: config.user.clone(),
            });
        }

        Ok(Self {
            config,
            handle,
        })
    }

    /// Run a command with the session's default timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        tracing::debug!(host = %self.config.host, command, "exec");
        tokio::time::timeout(timeout, exec::run(&self.handle, command))
            .await
            .map_err(|_| Error::CommandTimeout {
                command: command.to_string(),
                timeout,
            })?
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
