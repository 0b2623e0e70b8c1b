use std::time::Duration;

use crate::discovery::StreamFilter;
use crate::miner::MinerCommand;
use crate::rotation::{DurationRange, RotationSettings};
use crate::twitch::ClientCredentials;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SWITCH_DELAY_SECS: u64 = 30;

/// Settings needed by the one-time authorization setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    pub credentials: ClientCredentials,
    pub redirect_uri: String,
    pub http_timeout_secs: u64,
}

/// Full configuration of the rotation loop, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials: ClientCredentials,
    pub refresh_token: String,
    pub username: String,
    pub game_id: String,
    pub drops_only: bool,
    pub durations: DurationRange,
    pub viewer_threshold: u64,
    pub check_interval_secs: u64,
    pub miner_command: MinerCommand,
    pub debug: bool,
    pub drops_tag: String,
    pub switch_delay_secs: u64,
    pub page_limit: u32,
    pub redirect_uri: String,
    pub http_timeout_secs: u64,
}

/// Loggable view of a `Config`, without secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeSummary {
    pub client_id_configured: bool,
    pub refresh_token_configured: bool,
    pub game_id: String,
    pub drops_only: bool,
    pub min_minutes: u64,
    pub max_minutes: u64,
    pub viewer_threshold: u64,
    pub check_interval_secs: u64,
    pub page_limit: u32,
    pub miner_program: String,
}

impl Config {
    pub fn get_safe_summary(&self) -> SafeSummary {
        SafeSummary {
            client_id_configured: !self.credentials.client_id.is_empty(),
            refresh_token_configured: !self.refresh_token.is_empty(),
            game_id: self.game_id.clone(),
            drops_only: self.drops_only,
            min_minutes: self.durations.min_minutes(),
            max_minutes: self.durations.max_minutes(),
            viewer_threshold: self.viewer_threshold,
            check_interval_secs: self.check_interval_secs,
            page_limit: self.page_limit,
            miner_program: self.miner_command.program.clone(),
        }
    }

    pub fn stream_filter(&self) -> StreamFilter {
        StreamFilter::new(self.viewer_threshold, self.drops_only)
            .with_required_tag(self.drops_tag.clone())
    }

    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings::new(
            self.game_id.clone(),
            self.durations,
            Duration::from_secs(self.check_interval_secs),
        )
        .with_switch_delay(Duration::from_secs(self.switch_delay_secs))
    }
}
