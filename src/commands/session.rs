// ABOUTME: Shared helpers for the commands that work over SSH.
// ABOUTME: Used by the setup and docker commands.

use bondi::config::ServerConfig;
use bondi::diagnostics::{Diagnostics, Warning};
use bondi::error::Result;
use bondi::output::Output;
use bondi::ssh::Session;

/// Open an SSH session to `server`.
pub async fn open_session(server: &ServerConfig, output: &Output) -> Result<Session> {
    output.progress(&format!("  → Connecting to {}...", server.label()));
    Ok(Session::connect(server.session_config()?).await?)
}

/// Disconnect, recording a failure as a warning.
pub async fn close_session(session: Session, server: &ServerConfig, diag: &mut Diagnostics) {
    if let Err(e) = session.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {e}",
            server.label()
        )));
    }
}
