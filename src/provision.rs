// ABOUTME: Prepares a host for deployments: container engine, ACME file, agent.
// ABOUTME: Runs idempotent shell steps through any remote command runner.

use async_trait::async_trait;
use std::path::Path;

use crate::agent::AgentArgs;
use crate::deploy::DeploySettings;
use crate::ssh::Session;

const DOCKER_INSTALL: &str = "curl -fsSL https://get.docker.com -o /tmp/get-docker.sh && sudo sh /tmp/get-docker.sh";

/// A failed remote command.
#[derive(Debug, Clone, thiserror::Error)]
#[error("`{command}` failed: {message}")]
pub struct ExecError {
    pub command: String,
    pub message: String,
}

/// Runs shell commands on one host.
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// Run `command`, returning its stdout when it exits successfully.
    async fn run(&self, command: &str) -> Result<String, ExecError>;
}

#[async_trait]
impl RemoteExec for Session {
    async fn run(&self, command: &str) -> Result<String, ExecError> {
        let failed = |message: String| ExecError {
            command: command.to_string(),
            message,
        };

        let output = self.exec(command).await.map_err(|e| failed(e.to_string()))?;
        if output.success() {
            Ok(output.stdout)
        } else {
            let stderr = output.stderr.trim();
            Err(failed(if stderr.is_empty() {
                format!("exit code {}", output.exit_code)
            } else {
                format!("exit code {}: {stderr}", output.exit_code)
            }))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to install Docker: {0}")]
    InstallEngine(#[source] ExecError),

    #[error("failed to prepare ACME file {path}: {source}")]
    AcmeFile {
        path: String,
        #[source]
        source: ExecError,
    },

    #[error("failed to start agent {image}: {source}")]
    Agent {
        image: String,
        #[source]
        source: ExecError,
    },
}

/// What provisioning changed on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Version string reported by the engine after provisioning.
    pub engine_version: String,
    pub engine_installed: bool,
    pub acme_file_created: bool,
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Install Docker if missing and make sure the ACME file exists with mode 600.
pub async fn provision_host<R: RemoteExec + ?Sized>(
    remote: &R,
    settings: &DeploySettings,
) -> Result<ProvisionReport, ProvisionError> {
    let mut report = ProvisionReport::default();

    let version = match remote.run("docker --version").await {
        Ok(version) => {
            tracing::debug!(version = version.trim(), "docker present");
            version.trim().to_string()
        }
        Err(e) => {
            tracing::info!(reason = %e, "docker missing, installing");
            remote
                .run(DOCKER_INSTALL)
                .await
                .map_err(ProvisionError::InstallEngine)?;
            report.engine_installed = true;
            remote
                .run("docker --version")
                .await
                .map_err(ProvisionError::InstallEngine)?
                .trim()
                .to_string()
        }
    };
    report.engine_version = version;

    let acme = settings.acme_host_path.as_str();
    let acme_error = |source| ProvisionError::AcmeFile {
        path: acme.to_string(),
        source,
    };
    let file = shell_quote(acme);

    if remote.run(&format!("test -f {file}")).await.is_err() {
        let dir = Path::new(acme)
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("/");
        remote
            .run(&format!(
                "sudo mkdir -p {} && sudo touch {file}",
                shell_quote(dir)
            ))
            .await
            .map_err(acme_error)?;
        report.acme_file_created = true;
        tracing::info!(path = acme, "created ACME file");
    }

    remote
        .run(&format!("sudo chown root:root {file} && sudo chmod 600 {file}"))
        .await
        .map_err(acme_error)?;

    Ok(report)
}

/// How the agent container is run on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLaunch {
    pub container: String,
    /// Full image reference, tag included.
    pub image: String,
    pub port: u16,
    pub engine_socket: String,
    pub args: AgentArgs,
}

impl AgentLaunch {
    pub fn new(image: impl Into<String>, port: u16, settings: &DeploySettings) -> Self {
        Self {
            container: "bondi-agent".to_string(),
            image: image.into(),
            port,
            engine_socket: settings.engine_socket.clone(),
            args: AgentArgs::from_settings(settings, port),
        }
    }

    /// `docker run` for the agent: published port, engine socket mounted and
    /// the socket's group added so the agent may use it.
    pub fn run_command(&self) -> String {
        let socket = shell_quote(&self.engine_socket);
        let mut command = format!(
            "docker run -d --name {name} --restart unless-stopped -p {port}:{port} -v {socket}:{socket} --group-add $(stat -c %g {socket}) {image}",
            name = shell_quote(&self.container),
            port = self.port,
            image = shell_quote(&self.image),
        );
        for arg in self.args.to_args() {
            command.push(' ');
            command.push_str(&shell_quote(&arg));
        }
        command
    }

    fn lookup_command(&self) -> String {
        format!(
            "docker ps -a --filter {} --format '{{{{.Image}}}} {{{{.State}}}}'",
            shell_quote(&format!("name=^/{}$", self.container))
        )
    }
}

/// What [`ensure_agent`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentChange {
    /// The wanted image was already running.
    Unchanged,
    Started,
    /// A container of another image, or a stopped one, was removed first.
    Replaced { previous: String },
}

/// Run the agent container unless the wanted image already runs.
pub async fn ensure_agent<R: RemoteExec + ?Sized>(
    remote: &R,
    launch: &AgentLaunch,
) -> Result<AgentChange, ProvisionError> {
    let agent_error = |source| ProvisionError::Agent {
        image: launch.image.clone(),
        source,
    };

    let listing = remote
        .run(&launch.lookup_command())
        .await
        .map_err(agent_error)?;
    let existing = listing
        .lines()
        .find_map(|line| line.trim().split_once(' '))
        .map(|(image, state)| (image.to_string(), state.to_string()));

    let change = match existing {
        Some((image, state)) if image == launch.image && state == "running" => {
            tracing::debug!(image = %image, "agent up to date");
            return Ok(AgentChange::Unchanged);
        }
        Some((image, state)) => {
            tracing::info!(previous = %image, state = %state, wanted = %launch.image, "replacing agent");
            remote
                .run(&format!("docker rm -f {}", shell_quote(&launch.container)))
                .await
                .map_err(agent_error)?;
            AgentChange::Replaced { previous: image }
        }
        None => AgentChange::Started,
    };

    remote
        .run(&launch.run_command())
        .await
        .map_err(agent_error)?;
    tracing::info!(image = %launch.image, port = launch.port, "started agent");
    Ok(change)
}
