// ABOUTME: Remote command execution over an SSH session channel.
// ABOUTME: Collects stdout, stderr, and the exit status of one command.

use super::error::{Error, Result};
use super::host_keys::HostKeyPolicy;
use russh::ChannelMsg;
use russh::client::Handle;

/// Output of a finished remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub(crate) async fn run(handle: &Handle<HostKeyPolicy>, command: &str) -> Result<CommandOutput> {
    let exec_error = |reason: String| Error::Exec {
        command: command.to_string(),
        reason,
    };

    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| exec_error(e.to_string()))?;
    channel
        .exec(true, command)
        .await
        .map_err(|e| exec_error(e.to_string()))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut eof = false;

    // Exit status and EOF may arrive in either order.
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
            ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
            ChannelMsg::ExitStatus { exit_status } => {
                exit_code = Some(exit_status);
                if eof {
                    break;
                }
            }
            ChannelMsg::Eof => {
                eof = true;
                if exit_code.is_some() {
                    break;
                }
            }
            ChannelMsg::Close => break,
            _ => {}
        }
    }

    let exit_code = exit_code.ok_or_else(|| Error::ChannelClosed(command.to_string()))?;

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
