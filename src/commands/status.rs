// ABOUTME: Status command implementation.
// ABOUTME: Prints the service container status of every server as JSON.

use bondi::agent::AgentClient;
use bondi::config::{Config, ServerConfig};
use bondi::deploy::ServiceStatus;
use bondi::diagnostics::{Diagnostics, Warning};
use bondi::error::{Error, Result};
use bondi::output::Output;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
#[serde(untagged)]
enum HostStatus {
    Ok(ServiceStatus),
    Error { error: String },
}

pub async fn status(config: &Config, output: &Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let mut report = BTreeMap::new();

    for server in &config.servers {
        let entry = match host_status(config, server).await {
            Ok(status) => HostStatus::Ok(status),
            Err(Error::Agent { source, .. }) if source.is_not_found() => HostStatus::Error {
                error: "Container not found".to_string(),
            },
            Err(e) => {
                diag.warn(Warning::status_unavailable(format!("{}: {e}", server.label())));
                HostStatus::Error {
                    error: e.to_string(),
                }
            }
        };
        report.insert(server.label(), entry);
    }

    output.data(&report)?;
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    Ok(())
}

async fn host_status(config: &Config, server: &ServerConfig) -> Result<ServiceStatus> {
    let agent_error = |source| Error::Agent {
        host: server.label(),
        source,
    };
    let client = AgentClient::new(&server.host, config.agent.port, config.agent.deploy_timeout)
        .map_err(agent_error)?;
    client
        .status(&config.service.image_name)
        .await
        .map_err(agent_error)
}
