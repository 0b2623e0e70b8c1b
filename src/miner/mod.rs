//! External drop miner
//!
//! Watching a channel and claiming its drops is done by an external program.
//! The rotation loop only starts it for one channel, lets it run for the
//! session duration, and stops it. `DropMiner` is that contract.

use std::fmt;

use thiserror::Error;

#[cfg(test)]
pub mod mock;
pub mod process;

pub use process::ProcessMiner;

/// Placeholder replaced by the channel login in a command template
pub const CHANNEL_PLACEHOLDER: &str = "{channel}";

/// Placeholder replaced by the account username in a command template
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Errors reported by a miner run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinerError {
    /// The miner could not be started at all
    #[error("Failed to start miner '{program}': {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying error
        message: String,
    },

    /// The miner stopped with a failure status
    #[error("Miner exited with status {code:?}")]
    Exited {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
    },

    /// The miner task stopped without a result (panicked or was aborted)
    #[error("Miner task ended unexpectedly: {message}")]
    Crashed {
        /// Details from the task runtime
        message: String,
    },
}

/// Trait for programs that watch a channel and claim its drops
///
/// `mine` is expected to run until the miner stops on its own. Returning
/// `Ok(())` means it stopped cleanly; the rotation loop still treats any
/// return before the session deadline as an early end.
#[async_trait::async_trait]
pub trait DropMiner: Send + Sync {
    /// Mines drops on one channel
    async fn mine(&self, channel: &str) -> Result<(), MinerError>;

    /// Returns a short name for logs
    fn name(&self) -> &str;
}

/// A parsed `MINER_COMMAND` template
///
/// The template is split on whitespace; quoting is not interpreted. Any
/// argument may contain `{channel}` and `{username}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerCommand {
    /// Program to execute
    pub program: String,
    /// Argument templates
    pub args: Vec<String>,
}

impl MinerCommand {
    /// Parses a template, `None` when it holds no program
    pub fn parse(template: &str) -> Option<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Returns true if some argument names the channel
    pub fn mentions_channel(&self) -> bool {
        self.program.contains(CHANNEL_PLACEHOLDER)
            || self.args.iter().any(|a| a.contains(CHANNEL_PLACEHOLDER))
    }

    /// Substitutes the placeholders in every argument
    pub fn render_args(&self, channel: &str, username: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace(CHANNEL_PLACEHOLDER, channel)
                    .replace(USERNAME_PLACEHOLDER, username)
            })
            .collect()
    }
}

impl fmt::Display for MinerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
