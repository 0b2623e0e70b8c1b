#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("dropwatch").unwrap();
    cmd.env_clear();
    cmd
}

#[test]
fn test_verbose_flag_enables_debug_logging() {
    // DEBUG logs go to stderr, the version string to stdout
    cmd()
        .args(["--verbose", "version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dropwatch"))
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_short_verbose_flag_works() {
    cmd()
        .args(["-v", "version"])
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_default_mode_shows_no_debug() {
    cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("DEBUG").not())
        .stderr(predicate::str::contains("DEBUG").not());
}

#[test]
fn test_debug_variable_in_env_file_enables_debug_logging() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join(".env");
    fs::write(&env_path, "DEBUG=true\n").unwrap();

    cmd()
        .arg("--env-file")
        .arg(&env_path)
        .arg("version")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"));
}
