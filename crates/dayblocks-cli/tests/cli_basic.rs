//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_dayblocks"))
        .args(args)
        .env("DAYBLOCKS_DATA_DIR", data_dir)
        .env_remove("DAYBLOCKS_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("stdout is JSON")
}

#[test]
fn test_block_create_and_day_show() {
    let dir = tempfile::tempdir().unwrap();
    let block = run_json(
        dir.path(),
        &["block", "create", "Focus", "--date", "2024-01-08", "--start", "09:00", "--duration", "60"],
    );
    assert_eq!(block["start_time"], 540);
    let id = block["id"].as_str().unwrap();

    let plan = run_json(dir.path(), &["day", "show", "--date", "2024-01-08", "--today", "2024-01-08"]);
    let entries = plan["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["token"], id);
    assert!(!plan["gaps"].as_array().unwrap().is_empty());
}

#[test]
fn test_day_show_text_agenda() {
    let dir = tempfile::tempdir().unwrap();
    run_json(
        dir.path(),
        &["block", "create", "Focus", "--date", "2024-01-08", "--start", "09:00", "--duration", "60"],
    );

    let (code, stdout, stderr) = run_cli(
        dir.path(),
        &["day", "show", "--date", "2024-01-08", "--today", "2024-01-08", "--text"],
    );
    assert_eq!(code, 0, "{stderr}");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "2024-01-08");
    assert_eq!(lines[1], "06:00-09:00  free (3h)");
    assert!(lines[2].starts_with("09:00-10:00  Focus (1h)"), "{stdout}");
    assert_eq!(lines[3], "10:00-23:00  free (13h)");
}

#[test]
fn test_conflicting_block_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    run_json(
        dir.path(),
        &["block", "create", "Focus", "--date", "2024-01-08", "--start", "09:00", "--duration", "60"],
    );

    let (code, _, stderr) = run_cli(
        dir.path(),
        &["block", "create", "Call", "--date", "2024-01-08", "--start", "09:30", "--duration", "30"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_overlong_block_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["block", "create", "Forever", "--date", "2024-01-08", "--start", "10:00", "--duration", "2147483647"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("exceeds the maximum"), "stderr: {stderr}");

    let plan = run_json(dir.path(), &["day", "show", "--date", "2024-01-08"]);
    assert!(plan["entries"].as_array().unwrap().is_empty());
}

#[test]
fn test_status_on_virtual_token_forks() {
    let dir = tempfile::tempdir().unwrap();
    let template = run_json(
        dir.path(),
        &["block", "repeat", "Standup", "--date", "2024-01-08", "--start", "08:00", "--duration", "15"],
    );
    let token = format!("{}-virtual-2024-01-15", template["id"].as_str().unwrap());

    let outcome = run_json(dir.path(), &["block", "status", &token]);
    assert_eq!(outcome["forked"], true);
    assert_eq!(outcome["occurrence"]["forked_from"], template["id"]);

    let plan = run_json(dir.path(), &["day", "show", "--date", "2024-01-15"]);
    let entries = plan["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["occurrence"]["source"], "concrete");
}

#[test]
fn test_bad_virtual_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["block", "status", "abc-virtual-2024-13-40"]);
    assert_ne!(code, 0);
    assert!(!stderr.is_empty());
}

#[test]
fn test_backlog_add_and_suggest() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["backlog", "add", "Flashcards", "--duration", "20"]);
    run_json(
        dir.path(),
        &["backlog", "add", "Thesis", "--duration", "180", "--priority", "high", "--sub", "Methods:40"],
    );

    let best = run_json(
        dir.path(),
        &["backlog", "suggest", "--budget", "30", "--mode", "gap", "--today", "2024-01-08"],
    );
    assert_eq!(best["candidate"], "whole");
    assert_eq!(best["title"], "Flashcards");

    let ranked = run_json(
        dir.path(),
        &["backlog", "suggest", "--budget", "45", "--all", "--today", "2024-01-08"],
    );
    assert_eq!(ranked.as_array().unwrap().len(), 2);

    let listed = run_json(dir.path(), &["backlog", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[test]
fn test_item_add_and_toggle() {
    let dir = tempfile::tempdir().unwrap();
    let block = run_json(
        dir.path(),
        &["block", "create", "Focus", "--date", "2024-01-08", "--start", "09:00", "--duration", "60"],
    );
    let id = block["id"].as_str().unwrap();

    run_json(dir.path(), &["item", "add", id, "Inbox", "--duration", "15", "--pin", "09:30"]);
    let outcome = run_json(dir.path(), &["item", "toggle", id, "0"]);
    assert_eq!(outcome["forked"], false);
    assert_eq!(outcome["occurrence"]["sub_items"][0]["done"], true);
    assert_eq!(outcome["occurrence"]["sub_items"][0]["pinned_time"], 570);
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "planner.day_start", "07:00"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("ok"));

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "planner.day_start"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "07:00");

    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "planner.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("dayblocks"));
}
