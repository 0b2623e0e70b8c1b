//! Mining session types

use std::time::Duration;

use chrono::{DateTime, Local};
use rand::Rng;

use crate::miner::MinerError;

/// Inclusive range of session lengths in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    min_minutes: u64,
    max_minutes: u64,
}

impl DurationRange {
    /// Creates a range, `None` unless `1 <= min <= max`
    pub fn new(min_minutes: u64, max_minutes: u64) -> Option<Self> {
        (min_minutes >= 1 && min_minutes <= max_minutes).then_some(Self {
            min_minutes,
            max_minutes,
        })
    }

    /// Lower bound in minutes
    pub fn min_minutes(&self) -> u64 {
        self.min_minutes
    }

    /// Upper bound in minutes
    pub fn max_minutes(&self) -> u64 {
        self.max_minutes
    }

    /// Draws a whole number of minutes uniformly from the range
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.random_range(self.min_minutes..=self.max_minutes)
    }
}

/// One time-boxed run of the miner on one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningSession {
    /// Channel login
    pub channel: String,
    /// Planned length in minutes
    pub minutes: u64,
    /// Wall-clock start, for the operator
    pub started_at: DateTime<Local>,
}

impl MiningSession {
    /// Starts a session now
    pub fn start(channel: impl Into<String>, minutes: u64) -> Self {
        Self {
            channel: channel.into(),
            minutes,
            started_at: Local::now(),
        }
    }

    /// Planned length
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.minutes.saturating_mul(60))
    }

    /// Planned wall-clock end, `None` if it does not fit a timestamp
    pub fn planned_end(&self) -> Option<DateTime<Local>> {
        let delta = chrono::Duration::from_std(self.duration()).ok()?;
        self.started_at.checked_add_signed(delta)
    }
}

/// Why a session stopped
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// The drawn duration elapsed with the miner still running
    Completed,
    /// The miner stopped before the deadline
    MinerExited(Result<(), MinerError>),
    /// Shutdown was requested
    Interrupted,
}

impl SessionEnd {
    /// Returns true if the miner did not last the whole session
    pub fn is_early(&self) -> bool {
        matches!(self, SessionEnd::MinerExited(_))
    }
}

/// Result of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// The session that ran
    pub session: MiningSession,
    /// How it ended
    pub end: SessionEnd,
    /// Whether the channel was still eligible afterwards; `None` when the
    /// re-check was skipped because of shutdown
    pub still_live: Option<bool>,
}
