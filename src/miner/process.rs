//! Miner backed by an external process
//!
//! The child is spawned with `kill_on_drop`, so aborting the task that awaits
//! `mine` also terminates the process.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::miner::{DropMiner, MinerCommand, MinerError};

/// Runs `MINER_COMMAND` for each mining session
#[derive(Debug, Clone)]
pub struct ProcessMiner {
    command: MinerCommand,
    username: String,
    /// Inherit stdout/stderr instead of discarding the miner's output
    show_output: bool,
}

impl ProcessMiner {
    /// Creates a process miner for an account
    pub fn new(command: MinerCommand, username: impl Into<String>, show_output: bool) -> Self {
        Self {
            command,
            username: username.into(),
            show_output,
        }
    }

    /// Returns the command template
    pub fn command(&self) -> &MinerCommand {
        &self.command
    }

    /// Returns true if the miner's stdout/stderr reach the terminal
    pub fn shows_output(&self) -> bool {
        self.show_output
    }

    fn build(&self, channel: &str) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(self.command.render_args(channel, &self.username))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if self.show_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }
}

#[async_trait::async_trait]
impl DropMiner for ProcessMiner {
    async fn mine(&self, channel: &str) -> Result<(), MinerError> {
        let mut child = self.build(channel).spawn().map_err(|e| {
            let message = match e.kind() {
                std::io::ErrorKind::NotFound => "command not found in PATH".to_string(),
                std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
                _ => e.to_string(),
            };
            MinerError::Spawn {
                program: self.command.program.clone(),
                message,
            }
        })?;

        let pid = child.id().unwrap_or(0);
        info!(pid = pid, channel = channel, "Miner process started");

        let status = child.wait().await.map_err(|e| MinerError::Crashed {
            message: format!("failed to wait for miner process: {}", e),
        })?;

        if status.success() {
            debug!(pid = pid, channel = channel, "Miner process exited cleanly");
            Ok(())
        } else {
            warn!(pid = pid, channel = channel, status = %status, "Miner process failed");
            Err(MinerError::Exited {
                code: status.code(),
            })
        }
    }

    fn name(&self) -> &str {
        &self.command.program
    }
}
