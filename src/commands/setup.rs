// ABOUTME: Setup command implementation.
// ABOUTME: Provisions every configured server over SSH and starts its agent.

use super::session::{close_session, open_session};
use bondi::config::Config;
use bondi::deploy::DeploySettings;
use bondi::diagnostics::Diagnostics;
use bondi::error::Result;
use bondi::output::Output;
use bondi::provision::{
    AgentChange, AgentLaunch, ProvisionReport, RemoteExec, ensure_agent, provision_host,
};

pub async fn setup(config: &Config, output: &Output) -> Result<()> {
    let settings = config.settings();
    let launch = AgentLaunch::new(config.agent.image_ref(), config.agent.port, &settings);
    let mut diag = Diagnostics::default();

    for server in &config.servers {
        let session = open_session(server, output).await?;
        let result = setup_host(&session, &settings, &launch).await;
        close_session(session, server, &mut diag).await;

        let (report, agent) = result?;
        if report.engine_installed {
            output.progress(&format!("  ✓ Installed {}", report.engine_version));
        } else {
            output.progress(&format!("  ✓ Found {}", report.engine_version));
        }
        if report.acme_file_created {
            output.progress(&format!("  ✓ Created {}", settings.acme_host_path));
        }
        match agent {
            AgentChange::Unchanged => {
                output.progress(&format!("  ✓ Agent {} already running", launch.image));
            }
            AgentChange::Started => {
                output.progress(&format!("  ✓ Started agent {}", launch.image));
            }
            AgentChange::Replaced { previous } => {
                output.progress(&format!("  ✓ Replaced agent {previous} with {}", launch.image));
            }
        }
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.success(&format!("Set up {} server(s)", config.servers.len()));
    Ok(())
}

async fn setup_host<R: RemoteExec + ?Sized>(
    remote: &R,
    settings: &DeploySettings,
    launch: &AgentLaunch,
) -> Result<(ProvisionReport, AgentChange)> {
    let report = provision_host(remote, settings).await?;
    let agent = ensure_agent(remote, launch).await?;
    Ok((report, agent))
}
