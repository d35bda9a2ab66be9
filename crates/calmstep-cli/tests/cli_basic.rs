//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME so the
//! data directory starts empty.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_calmstep"))
        .args(args)
        .env("HOME", home.path())
        .env("CALMSTEP_ENV", "dev")
        .env("CALMSTEP_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_start_then_start_again() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["start", "42"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("30-day"), "unexpected output: {stdout}");

    let (code, stdout, _) = run_cli(&home, &["start", "42"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Welcome back"));
}

#[test]
fn test_today_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["today", "42", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["program_day"], 1);
    assert_eq!(parsed["status"]["morning"], false);
}

#[test]
fn test_done_and_stats() {
    let home = TempDir::new().unwrap();
    assert_eq!(run_cli(&home, &["done", "42", "morning"]).0, 0);
    assert_eq!(run_cli(&home, &["done", "42", "evening"]).0, 0);

    let (code, stdout, _) = run_cli(&home, &["stats", "42", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["completed_days"], 1);
    assert_eq!(parsed["total_days"], 1);
}

#[test]
fn test_stats_unknown_user() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["stats", "nobody"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("0 of 0"));
}

#[test]
fn test_timezone_updates_jobs() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["timezone", "42", "-5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("13:00 UTC"), "unexpected output: {stdout}");

    let (code, stdout, _) = run_cli(&home, &["timezone", "42", "+3"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("05:00 UTC"));

    let (code, stdout, _) = run_cli(&home, &["jobs", "--json"]);
    assert_eq!(code, 0);
    let jobs: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["user_id"], "42");
    assert_eq!(jobs[0]["fire_hour"], 5);
}

#[test]
fn test_timezone_out_of_range_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["timezone", "42", "15"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_panic() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["panic"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Grounding anchor"));
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "reminders.local_hour"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "8");

    assert_eq!(
        run_cli(&home, &["config", "set", "reminders.local_hour", "9"]).0,
        0
    );
    let (_, stdout, _) = run_cli(&home, &["config", "get", "reminders.local_hour"]);
    assert_eq!(stdout.trim(), "9");

    let (code, _, _) = run_cli(&home, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_serve_timezone_conversation() {
    let home = TempDir::new().unwrap();
    assert_eq!(
        run_cli(&home, &["config", "set", "reminders.enabled", "false"]).0,
        0
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_calmstep"))
        .arg("serve")
        .env("HOME", home.path())
        .env("CALMSTEP_ENV", "dev")
        .env("CALMSTEP_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start serve");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"42 timezone\n42 +3\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output: {stdout}");
    assert!(lines[0].starts_with("[42] Send your UTC offset"));
    assert!(lines[1].contains("UTC+3"));
    assert!(lines[1].contains("05:00 UTC"));

    let (_, stdout, _) = run_cli(&home, &["jobs", "--json"]);
    let jobs: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(jobs[0]["fire_hour"], 5);
}
