//! Channel rotation loop
//!
//! Drives the `POLLING -> MINING -> POLLING` cycle: build the eligible pool,
//! pick one channel at random, mine it for a random number of minutes,
//! re-check whether it is still eligible, pause, repeat.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::discovery::{EligibleStream, StreamFinder, contains_channel};
use crate::miner::{DropMiner, MinerError};
use crate::twitch::ApiError;
use crate::twitch::error::Result;

pub mod countdown;
pub mod session;

pub use session::{DurationRange, MiningSession, SessionEnd, SessionReport};

/// Delay between startup and the first poll
pub const STARTUP_DELAY: Duration = Duration::from_secs(3);

/// Default pause between two sessions
pub const DEFAULT_SWITCH_DELAY: Duration = Duration::from_secs(30);

/// Immutable settings of the rotation loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSettings {
    /// Category searched on every poll
    pub game_id: String,
    /// Session length bounds
    pub durations: DurationRange,
    /// Wait after a poll that found nothing
    pub check_interval: Duration,
    /// Wait after a session before the next poll
    pub switch_delay: Duration,
    /// Wait before the first poll
    pub startup_delay: Duration,
}

impl RotationSettings {
    /// Creates settings with the default switch and startup delays
    pub fn new(game_id: impl Into<String>, durations: DurationRange, check_interval: Duration) -> Self {
        Self {
            game_id: game_id.into(),
            durations,
            check_interval,
            switch_delay: DEFAULT_SWITCH_DELAY,
            startup_delay: STARTUP_DELAY,
        }
    }

    /// Replaces the category
    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    /// Sets the pause between sessions
    pub fn with_switch_delay(mut self, switch_delay: Duration) -> Self {
        self.switch_delay = switch_delay;
        self
    }

    /// Sets the pause before the first poll
    pub fn with_startup_delay(mut self, startup_delay: Duration) -> Self {
        self.startup_delay = startup_delay;
        self
    }
}

/// Why a cycle did not mine anything
#[derive(Debug, Clone, PartialEq)]
pub enum IdleReason {
    /// The poll succeeded but no stream passed the filter
    NoStreams,
    /// The poll failed with a non-fatal error
    Unavailable(ApiError),
}

/// Result of one polling pass
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing to mine this time
    Idle(IdleReason),
    /// A session ran
    Mined(SessionReport),
}

/// Picks a channel uniformly at random, `None` on an empty pool
pub fn select_channel<'a, R: rand::Rng + ?Sized>(
    pool: &'a [EligibleStream],
    rng: &mut R,
) -> Option<&'a EligibleStream> {
    pool.choose(rng)
}

/// The rotation orchestrator
pub struct Rotator {
    finder: StreamFinder,
    miner: Arc<dyn DropMiner>,
    settings: RotationSettings,
    rng: StdRng,
}

impl Rotator {
    /// Creates a rotator seeded from the OS
    pub fn new(finder: StreamFinder, miner: Arc<dyn DropMiner>, settings: RotationSettings) -> Self {
        Self {
            finder,
            miner,
            settings,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replaces the random source with a seeded one
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Runs cycles until a shutdown signal arrives or a fatal error occurs
    ///
    /// The access token is obtained before anything else so that an unusable
    /// refresh token stops the program immediately.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        self.finder.tokens().access_token().await?;
        info!(
            game_id = %self.settings.game_id,
            min_minutes = self.settings.durations.min_minutes(),
            max_minutes = self.settings.durations.max_minutes(),
            miner = self.miner.name(),
            "Starting in {} s …",
            self.settings.startup_delay.as_secs()
        );

        if !wait_or_shutdown(self.settings.startup_delay, &mut shutdown).await {
            info!("Shutdown requested before the first poll");
            return Ok(());
        }

        loop {
            let pause = match self.run_cycle(&mut shutdown).await? {
                CycleOutcome::Idle(reason) => {
                    match reason {
                        IdleReason::NoStreams => info!(
                            "⏸️  Idle – none found, waiting {} sec …",
                            self.settings.check_interval.as_secs()
                        ),
                        IdleReason::Unavailable(e) => warn!(
                            error = %e,
                            "⏸️  Stream list unavailable, waiting {} sec …",
                            self.settings.check_interval.as_secs()
                        ),
                    }
                    self.settings.check_interval
                }
                CycleOutcome::Mined(report) => {
                    if report.end == SessionEnd::Interrupted {
                        break;
                    }
                    let state = match report.still_live {
                        Some(true) => "live",
                        _ => "offline",
                    };
                    info!(
                        "✅  Switch  ({})  – {} s",
                        state,
                        self.settings.switch_delay.as_secs()
                    );
                    self.settings.switch_delay
                }
            };

            if !wait_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }

        info!("Rotation stopped");
        Ok(())
    }

    /// Runs one polling pass and, if the pool is not empty, one session
    pub async fn run_cycle(&mut self, shutdown: &mut mpsc::Receiver<()>) -> Result<CycleOutcome> {
        let pool = match self.finder.find_eligible(&self.settings.game_id).await {
            Ok(pool) => pool,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(CycleOutcome::Idle(IdleReason::Unavailable(e))),
        };

        let Some(choice) = select_channel(&pool, &mut self.rng) else {
            return Ok(CycleOutcome::Idle(IdleReason::NoStreams));
        };
        let channel = choice.login.clone();
        info!(
            viewers = choice.viewer_count,
            "🎲  {}  (pool: {})",
            channel,
            pool.len()
        );

        let report = self.run_session(&channel, shutdown).await?;
        Ok(CycleOutcome::Mined(report))
    }

    /// Mines one channel for a randomly drawn duration
    ///
    /// The session stops at the deadline, when the miner stops on its own, or
    /// on shutdown. The miner task is aborted in every case. Unless shut down,
    /// the channel's eligibility is then re-checked.
    pub async fn run_session(
        &mut self,
        channel: &str,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> Result<SessionReport> {
        let minutes = self.settings.durations.draw(&mut self.rng);
        let session = MiningSession::start(channel, minutes);
        info!(
            planned_end = ?session.planned_end().map(|t| t.format("%H:%M").to_string()),
            "[START] {}",
            channel
        );
        info!("  ⏳  {} min …", minutes);

        let miner = Arc::clone(&self.miner);
        let target = channel.to_string();
        let mut mining = tokio::spawn(async move { miner.mine(&target).await });
        let (countdown, stop_countdown) = countdown::spawn_countdown(channel, minutes);

        let end = tokio::select! {
            _ = tokio::time::sleep(session.duration()) => SessionEnd::Completed,
            joined = &mut mining => {
                let result = joined.unwrap_or_else(|e| {
                    Err(MinerError::Crashed { message: e.to_string() })
                });
                SessionEnd::MinerExited(result)
            }
            _ = shutdown.recv() => SessionEnd::Interrupted,
        };

        mining.abort();
        let _ = stop_countdown.send(()).await;
        if let Err(e) = countdown.await {
            debug!(error = %e, "Countdown task did not finish cleanly");
        }

        match &end {
            SessionEnd::Completed => info!("[END] {}", channel),
            SessionEnd::MinerExited(Ok(())) => {
                warn!(channel = channel, "[END] {} – miner stopped before the deadline", channel)
            }
            SessionEnd::MinerExited(Err(e)) => {
                error!(channel = channel, error = %e, "[END] {} – miner failed", channel)
            }
            SessionEnd::Interrupted => info!("[END] {} – shutdown requested", channel),
        }

        let still_live = if end == SessionEnd::Interrupted {
            None
        } else {
            Some(self.still_eligible(channel).await?)
        };

        Ok(SessionReport {
            session,
            end,
            still_live,
        })
    }

    async fn still_eligible(&self, channel: &str) -> Result<bool> {
        match self.finder.find_eligible(&self.settings.game_id).await {
            Ok(pool) => Ok(contains_channel(&pool, channel)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, channel = channel, "Eligibility re-check failed, assuming offline");
                Ok(false)
            }
        }
    }
}

/// Sleeps for `duration`; returns false if shutdown was requested first
async fn wait_or_shutdown(duration: Duration, shutdown: &mut mpsc::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.recv() => false,
    }
}
