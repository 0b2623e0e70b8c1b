#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FULL_ENV: &[(&str, &str)] = &[
    ("CLIENT_ID", "cid"),
    ("CLIENT_SECRET", "csecret"),
    ("TWITCH_REFRESH_TOKEN", "rtoken"),
    ("USERNAME", "viewer"),
    ("GAME_ID", "509658"),
    ("DROPS_ONLY_MODE", "true"),
    ("MINING_DURATION_MIN", "10"),
    ("MINING_DURATION_MAX", "20"),
    ("VIEWER_THRESHOLD", "50"),
    ("CHECK_INTERVAL", "120"),
    ("MINER_COMMAND", "miner {channel}"),
];

/// Command with a clean environment and an env file that does not exist
fn cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dropwatch").unwrap();
    cmd.env_clear()
        .current_dir(temp_dir.path())
        .arg("--env-file")
        .arg(temp_dir.path().join("missing.env"));
    cmd
}

fn env_without(name: &str) -> Vec<(&'static str, &'static str)> {
    FULL_ENV.iter().copied().filter(|(k, _)| *k != name).collect()
}

#[test]
fn test_run_without_configuration_fails() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Required .env variable 'CLIENT_ID' is missing!",
        ));
}

#[test]
fn test_default_command_is_run() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CLIENT_ID"));
}

#[test]
fn test_missing_variable_is_named() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .envs(env_without("VIEWER_THRESHOLD"))
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'VIEWER_THRESHOLD' is missing"));
}

#[test]
fn test_invalid_number_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .envs(env_without("MINING_DURATION_MIN"))
        .env("MINING_DURATION_MIN", "ten")
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error parsing 'MINING_DURATION_MIN'"));
}

#[test]
fn test_invalid_bool_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .envs(env_without("DROPS_ONLY_MODE"))
        .env("DROPS_ONLY_MODE", "maybe")
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DROPS_ONLY_MODE"));
}

#[test]
fn test_inverted_duration_range_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .envs(env_without("MINING_DURATION_MAX"))
        .env("MINING_DURATION_MAX", "5")
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MINING_DURATION_MAX"));
}

#[test]
fn test_values_are_read_from_env_file() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("custom.env");
    let content: String = env_without("MINER_COMMAND")
        .iter()
        .map(|(k, v)| format!("{}={}\n", k, v))
        .collect();
    fs::write(&env_path, content).unwrap();

    let mut cmd = Command::cargo_bin("dropwatch").unwrap();
    cmd.env_clear()
        .current_dir(temp_dir.path())
        .arg("--env-file")
        .arg(&env_path)
        .args(["run", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'MINER_COMMAND' is missing"));
}

#[test]
fn test_auth_requires_client_credentials() {
    let temp_dir = TempDir::new().unwrap();
    cmd(&temp_dir)
        .args(["auth", "--code", "abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CLIENT_ID"));
}

#[test]
fn test_auth_with_blank_code_prints_url_and_fails() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("missing.env");

    cmd(&temp_dir)
        .env("CLIENT_ID", "my-client")
        .env("CLIENT_SECRET", "my-secret")
        .args(["auth", "--code", "   "])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("https://id.twitch.tv/oauth2/authorize"))
        .stdout(predicate::str::contains("client_id=my-client"))
        .stderr(predicate::str::contains("No authorization code entered"));

    assert!(!env_path.exists());
}
