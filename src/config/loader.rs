use crate::config::schema::{
    Config, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REDIRECT_URI, DEFAULT_SWITCH_DELAY_SECS,
    SetupConfig,
};
use crate::discovery::{DEFAULT_DROPS_TAG, DEFAULT_PAGE_LIMIT};
use crate::miner::MinerCommand;
use crate::rotation::DurationRange;
use crate::twitch::ClientCredentials;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required .env variable '{name}' is missing!")]
    Missing { name: &'static str },

    #[error("Error parsing '{name}': {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },

    #[error("Failed to load env file {path:?}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Loads the env file into the process environment and returns its path
///
/// An explicit path that does not exist is not an error; it is still
/// returned so the setup command can create it. Without an explicit path the
/// nearest `.env` in the working directory or its parents is used, falling
/// back to `./.env`. Variables already set in the process take precedence.
pub fn load_env_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => {
            if path.exists() {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            Ok(path.to_path_buf())
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(path),
            Err(e) if e.not_found() => Ok(PathBuf::from(DEFAULT_ENV_FILE)),
            Err(e) => Err(ConfigError::EnvFile {
                path: PathBuf::from(DEFAULT_ENV_FILE),
                message: e.to_string(),
            }),
        },
    }
}

/// Reads `DEBUG` leniently, for logging setup before the full config exists
pub fn debug_enabled() -> bool {
    std::env::var("DEBUG")
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false)
}

/// Loads the rotation config from the process environment
pub fn load_config() -> Result<Config, ConfigError> {
    tracing::debug!("Loading configuration from environment");
    let config = load_config_from(|name| std::env::var(name).ok())?;

    let summary = config.get_safe_summary();
    tracing::debug!(
        client_id_configured = summary.client_id_configured,
        refresh_token_configured = summary.refresh_token_configured,
        game_id = %summary.game_id,
        drops_only = summary.drops_only,
        min_minutes = summary.min_minutes,
        max_minutes = summary.max_minutes,
        viewer_threshold = summary.viewer_threshold,
        check_interval_secs = summary.check_interval_secs,
        page_limit = summary.page_limit,
        miner = %summary.miner_program,
        "Configuration loaded successfully"
    );
    Ok(config)
}

/// Loads the setup config from the process environment
pub fn load_setup_config() -> Result<SetupConfig, ConfigError> {
    load_setup_config_from(|name| std::env::var(name).ok())
}

/// Builds the rotation config from a variable lookup
pub fn load_config_from<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let setup = load_setup_config_from(&lookup)?;

    let refresh_token = required(&lookup, "TWITCH_REFRESH_TOKEN")?;
    let username = required(&lookup, "USERNAME")?;
    let game_id = required(&lookup, "GAME_ID")?;
    let drops_only = required_bool(&lookup, "DROPS_ONLY_MODE")?;
    let min_minutes: u64 = required_parsed(&lookup, "MINING_DURATION_MIN")?;
    let max_minutes: u64 = required_parsed(&lookup, "MINING_DURATION_MAX")?;
    let viewer_threshold: u64 = required_parsed(&lookup, "VIEWER_THRESHOLD")?;
    let check_interval_secs: u64 = required_parsed(&lookup, "CHECK_INTERVAL")?;

    let miner_template = required(&lookup, "MINER_COMMAND")?;
    let miner_command = MinerCommand::parse(&miner_template).ok_or(ConfigError::Invalid {
        name: "MINER_COMMAND",
        message: "no program given".to_string(),
    })?;
    if !miner_command.mentions_channel() {
        tracing::warn!(
            "MINER_COMMAND has no {{channel}} placeholder; every session will run the same command"
        );
    }

    if min_minutes == 0 {
        return Err(ConfigError::Invalid {
            name: "MINING_DURATION_MIN",
            message: "must be at least 1 minute".to_string(),
        });
    }
    let durations =
        DurationRange::new(min_minutes, max_minutes).ok_or_else(|| ConfigError::Invalid {
            name: "MINING_DURATION_MAX",
            message: format!(
                "must be greater than or equal to MINING_DURATION_MIN ({})",
                min_minutes
            ),
        })?;

    let debug = optional_bool(&lookup, "DEBUG")?.unwrap_or(false);
    let drops_tag = optional(&lookup, "DROPS_TAG").unwrap_or_else(|| DEFAULT_DROPS_TAG.to_string());
    let switch_delay_secs =
        optional_parsed(&lookup, "SWITCH_DELAY")?.unwrap_or(DEFAULT_SWITCH_DELAY_SECS);
    let page_limit: u32 = optional_parsed(&lookup, "STREAM_PAGE_LIMIT")?.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page_limit == 0 {
        return Err(ConfigError::Invalid {
            name: "STREAM_PAGE_LIMIT",
            message: "must be at least 1".to_string(),
        });
    }

    Ok(Config {
        credentials: setup.credentials,
        refresh_token,
        username,
        game_id,
        drops_only,
        durations,
        viewer_threshold,
        check_interval_secs,
        miner_command,
        debug,
        drops_tag,
        switch_delay_secs,
        page_limit,
        redirect_uri: setup.redirect_uri,
        http_timeout_secs: setup.http_timeout_secs,
    })
}

/// Builds the setup config from a variable lookup
pub fn load_setup_config_from<F>(lookup: F) -> Result<SetupConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = required(&lookup, "CLIENT_ID")?;
    let client_secret = required(&lookup, "CLIENT_SECRET")?;
    let redirect_uri =
        optional(&lookup, "REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
    let http_timeout_secs =
        optional_parsed(&lookup, "HTTP_TIMEOUT")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    if http_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            name: "HTTP_TIMEOUT",
            message: "must be at least 1 second".to_string(),
        });
    }

    Ok(SetupConfig {
        credentials: ClientCredentials::new(client_id, client_secret),
        redirect_uri,
        http_timeout_secs,
    })
}

fn optional<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing { name })
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        message: format!("'{}': {}", raw, e),
    })
}

fn required_parsed<T, F>(lookup: &F, name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    parse_value(name, &required(lookup, name)?)
}

fn optional_parsed<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name)
        .map(|raw| parse_value(name, &raw))
        .transpose()
}

/// Accepts the usual spellings of a boolean flag
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_value(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    parse_bool(raw).ok_or_else(|| ConfigError::Invalid {
        name,
        message: format!("'{}' is not a boolean (use true or false)", raw),
    })
}

fn required_bool<F>(lookup: &F, name: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    bool_value(name, &required(lookup, name)?)
}

fn optional_bool<F>(lookup: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name)
        .map(|raw| bool_value(name, &raw))
        .transpose()
}

/// Sets keys in an env file, preserving every other line
///
/// Existing assignments of a key are replaced in place; new keys are
/// appended. The file is created if needed and left with 0600 permissions.
pub fn upsert_env_vars(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read env file: {:?}", path));
        }
    };

    let content = merge_env_content(&existing, entries);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create env file directory: {:?}", parent))?;
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create env file: {:?}", path))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write env file: {:?}", path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = file.metadata()?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on env file: {:?}", path))?;
    }

    tracing::debug!(
        path = ?path,
        keys = ?entries.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
        "Env file updated"
    );
    Ok(())
}

fn merge_env_content(existing: &str, entries: &[(&str, &str)]) -> String {
    let mut pending: Vec<(&str, &str)> = entries.to_vec();
    let mut lines: Vec<String> = Vec::new();

    for line in existing.lines() {
        let replacement = env_line_key(line)
            .and_then(|key| pending.iter().position(|(k, _)| *k == key))
            .map(|pos| pending.remove(pos));

        match replacement {
            Some((key, value)) => lines.push(format_env_line(key, value)),
            None => lines.push(line.to_string()),
        }
    }

    lines.extend(pending.into_iter().map(|(k, v)| format_env_line(k, v)));

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

fn env_line_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, _) = trimmed.split_once('=')?;
    Some(key.trim())
}

fn format_env_line(key: &str, value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$'));

    if !needs_quotes {
        format!("{}={}", key, value)
    } else if !value.contains('\'') {
        // Single quotes are taken literally by dotenv parsers
        format!("{}='{}'", key, value)
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("{}=\"{}\"", key, escaped)
    }
}
