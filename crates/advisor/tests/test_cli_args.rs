//! CLI argument parsing tests for the plan advisor

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn advisor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_advisor"))
}

#[test]
fn test_help_flag() {
    let mut cmd = advisor();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Telecom plan advisor"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_version_flag() {
    let mut cmd = advisor();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    let mut cmd = advisor();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_lists_subcommands() {
    let mut cmd = advisor();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_ask_help() {
    let mut cmd = advisor();
    cmd.args(["ask", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Ask a single question"))
        .stdout(predicate::str::contains("-m, --message"));
}

#[test]
fn test_ask_requires_message() {
    let mut cmd = advisor();
    cmd.arg("ask");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--message"));
}

#[test]
fn test_chat_help() {
    let mut cmd = advisor();
    cmd.args(["chat", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Chat with the advisor"))
        .stdout(predicate::str::contains("-s, --session"))
        .stdout(predicate::str::contains("--persist"));
}

#[test]
fn test_unknown_subcommand() {
    let mut cmd = advisor();
    cmd.arg("deploy");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_global_verbose_after_subcommand() {
    let mut cmd = advisor();
    cmd.args(["status", "--verbose", "--help"]);
    cmd.assert().success();
}
