//! Integration tests for the `ui-poll` demo binary

use assert_cmd::Command;
use predicates::prelude::*;

fn ui_poll() -> Command {
    let mut cmd = Command::cargo_bin("ui-poll").expect("binary should build");
    cmd.env("UI_POLL_CONFIG", "/nonexistent/ui-poll/config.toml");
    cmd
}

#[test]
fn test_simulated_pick_wins_and_queued_cell_replays() {
    ui_poll()
        .args(["--pick-after-ms", "50", "--color", "plum", "--timeout-secs", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plum (user)"))
        .stdout(predicate::str::contains("replayed cell-2"));
}

#[test]
fn test_timeout_falls_back_to_default() {
    ui_poll()
        .args(["--timeout-secs", "0.2", "--default", "wheat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wheat (timeout)"))
        .stdout(predicate::str::contains("replayed cell-2"))
        .stderr(predicate::str::contains("Times up!"));
}

#[test]
fn test_unrepresentable_timeout_is_an_error() {
    ui_poll()
        .args(["--timeout-secs", "inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --timeout-secs"));
}
