#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("dropwatch").unwrap();
    cmd.env_clear();
    cmd
}

#[test]
fn test_version_command() {
    cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dropwatch"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_flags() {
    for flag in ["--version", "-V"] {
        cmd()
            .arg(flag)
            .assert()
            .code(0)
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

#[test]
fn test_help_lists_commands_and_global_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dropwatch"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--env-file"));
}

#[test]
fn test_run_help_shows_options() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--game"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_auth_help_shows_code_option() {
    cmd()
        .args(["auth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--code"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    cmd().arg("frobnicate").assert().code(2);
}

#[test]
fn test_unknown_flag_is_usage_error() {
    cmd().args(["run", "--no-such-flag"]).assert().code(2);
}
