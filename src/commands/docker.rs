// ABOUTME: Docker passthrough commands run on every server over SSH.
// ABOUTME: Lists containers or prints one container's logs per server.

use super::session::{close_session, open_session};
use bondi::config::{Config, ServerConfig};
use bondi::diagnostics::Diagnostics;
use bondi::error::{Error, Result};
use bondi::output::Output;
use bondi::provision::shell_quote;
use bondi::ssh::Session;

/// `docker ps` on every server.
pub async fn docker_ps(config: &Config, output: &Output) -> Result<()> {
    run_on_servers(config, "docker ps", "docker ps", output).await
}

/// `docker logs <container>` on every server.
pub async fn docker_logs(config: &Config, container: &str, output: &Output) -> Result<()> {
    let command = format!("docker logs {}", shell_quote(container));
    run_on_servers(config, "docker logs", &command, output).await
}

async fn run_on_servers(
    config: &Config,
    title: &str,
    command: &str,
    output: &Output,
) -> Result<()> {
    let mut diag = Diagnostics::default();

    for server in &config.servers {
        let session = open_session(server, output).await?;
        let result = run_command(&session, server, command).await;
        close_session(session, server, &mut diag).await;

        let text = result?;
        output.text(&format!("[{title}] Server: {}\n{text}", server.label()));
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    Ok(())
}

/// Stdout followed by stderr; `docker logs` replays the container's stderr there.
async fn run_command(session: &Session, server: &ServerConfig, command: &str) -> Result<String> {
    let result = session.exec(command).await?;
    if !result.success() {
        if !result.stderr.trim().is_empty() {
            tracing::warn!(command, stderr = result.stderr.trim(), "remote command failed");
        }
        return Err(Error::RemoteCommand {
            host: server.label(),
            command: command.to_string(),
            code: result.exit_code,
        });
    }
    Ok(format!("{}{}", result.stdout, result.stderr))
}
