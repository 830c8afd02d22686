// ABOUTME: Deploy command implementation.
// ABOUTME: Asks each server's agent to deploy, in order, stopping at the first failure.

use bondi::agent::AgentClient;
use bondi::config::{Config, ServerConfig};
use bondi::deploy::DeployRequest;
use bondi::error::{Error, Result};
use bondi::output::Output;
use tokio_util::sync::CancellationToken;

/// Deploy `tag` to all configured servers.
pub async fn deploy(
    config: &Config,
    tag: &str,
    cancel: &CancellationToken,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();

    let request = config.deploy_request(tag)?;

    output.progress(&format!(
        "Deploying {}:{} to {} server(s)",
        request.image_name,
        tag,
        config.servers.len()
    ));
    if request.wants_proxy() {
        output.progress(&format!(
            "  Reverse proxy: {}",
            request.proxy_domain_name.as_deref().unwrap_or_default()
        ));
    }

    for server in &config.servers {
        let container = deploy_to_server(config, server, &request, cancel, output).await?;
        output.progress(&format!("  ✓ {} running {container}", server.label()));
    }

    output.success("Deployment complete!");
    Ok(())
}

/// The agent finishes a run it has started even when we stop waiting.
async fn deploy_to_server(
    config: &Config,
    server: &ServerConfig,
    request: &DeployRequest,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<String> {
    let agent_error = |source| Error::Agent {
        host: server.label(),
        source,
    };

    let client = AgentClient::new(&server.host, config.agent.port, config.agent.deploy_timeout)
        .map_err(agent_error)?;
    output.progress(&format!("  → Deploying via {}...", client.base_url()));

    let reply = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(Error::Cancelled {
                host: server.label(),
            });
        }
        reply = client.deploy(request) => reply.map_err(agent_error)?,
    };

    Ok(short_id(&reply.container_id).to_string())
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
