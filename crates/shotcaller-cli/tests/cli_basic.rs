//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway HOME so no
//! real config or workout log is touched.

use std::path::Path;
use std::process::Command;

fn run_cli_in(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "shotcaller-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .env("SHOTCALLER_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn techniques_list_shows_styles() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli_in(home.path(), &["techniques", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("boxing"));
    assert!(stdout.contains("khao"));
}

#[test]
fn techniques_list_category_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli_in(home.path(), &["techniques", "list", "boxing", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["singles"].as_array().is_some());
}

#[test]
fn techniques_list_unknown_category_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli_in(home.path(), &["techniques", "list", "kung-fu"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown style"));
}

#[test]
fn config_set_then_show_round_trips() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli_in(home.path(), &["config", "set", "rounds", "7"]);
    assert_eq!(code, 0);
    let (_, _, code) = run_cli_in(home.path(), &["config", "set", "difficulty", "hard"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli_in(home.path(), &["config", "show", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["session"]["rounds_count"], 7);
    assert_eq!(parsed["session"]["difficulty"], "hard");
}

#[test]
fn config_set_clamps_round_minutes() {
    let home = tempfile::tempdir().unwrap();
    run_cli_in(home.path(), &["config", "set", "round-min", "99"]);
    let (stdout, _, _) = run_cli_in(home.path(), &["config", "show", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["session"]["round_min"], 30.0);
}

#[test]
fn config_set_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli_in(home.path(), &["config", "set", "nope", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("nope"));
}

#[test]
fn config_reset_restores_defaults() {
    let home = tempfile::tempdir().unwrap();
    run_cli_in(home.path(), &["config", "set", "rounds", "9"]);
    let (_, _, code) = run_cli_in(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli_in(home.path(), &["config", "show", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["session"]["rounds_count"], 5);
}

#[test]
fn session_log_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli_in(home.path(), &["session", "log"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no workouts logged"));
}

/// Resuming picks up the playback settings stored in the log entry, not
/// whatever the current config says.
#[test]
fn session_resume_replays_logged_settings() {
    let home = tempfile::tempdir().unwrap();
    let log_dir = home.path().join(".config/shotcaller-dev");
    std::fs::create_dir_all(&log_dir).unwrap();
    let record = serde_json::json!({
        "id": "11111111-2222-3333-4444-555555555555",
        "timestamp": "2026-08-28T10:00:00Z",
        "rounds_planned": 1,
        "rounds_completed": 0,
        "round_length_min": 0.25,
        "rest_minutes": 0.25,
        "difficulty": "medium",
        "shots_called_out": 0,
        "categories": ["boxing"],
        "settings": {
            "rounds_count": 1,
            "round_min": 0.25,
            "rest_minutes": 0.25,
            "difficulty": "medium",
            "southpaw_mode": false,
            "read_in_order": true,
            "add_calisthenics": false,
            "categories": ["boxing"],
            "voice": null,
            "voice_speed": 1.0
        }
    });
    std::fs::write(log_dir.join("workouts.jsonl"), format!("{record}\n")).unwrap();

    let (stdout, stderr, code) =
        run_cli_in(home.path(), &["session", "resume", "--silent", "--json"]);
    assert_eq!(code, 0, "resume failed: {stderr}");
    assert!(stderr.contains("resuming at round 1 of 1"));

    let callouts: Vec<String> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v["type"] == "CalloutSpoken")
        .filter_map(|v| v["text"].as_str().map(String::from))
        .collect();
    // Ordered reading came from the logged settings; the default config
    // would shuffle.
    assert_eq!(callouts.first().map(String::as_str), Some("1"));

    let (stdout, _, code) = run_cli_in(home.path(), &["session", "log", "--json"]);
    assert_eq!(code, 0);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records[1]["rounds_completed"], 1);
}

/// One real (silent) session end to end: a single 15 s round. This is the
/// slowest test in the suite but it exercises the whole stack.
#[test]
fn silent_session_runs_to_completion() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli_in(
        home.path(),
        &[
            "session", "run", "--silent", "--json", "--rounds", "1", "--round-min", "0.25",
            "--category", "boxing",
        ],
    );
    assert_eq!(code, 0, "session failed: {stderr}");

    let types: Vec<String> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter_map(|v| v["type"].as_str().map(String::from))
        .collect();
    assert!(types.contains(&"PreRoundStarted".to_string()));
    assert!(types.contains(&"RoundStarted".to_string()));
    assert!(types.contains(&"WorkoutCompleted".to_string()));

    // The completed workout landed in the log.
    let (stdout, _, code) = run_cli_in(home.path(), &["session", "log", "--json"]);
    assert_eq!(code, 0);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records[0]["rounds_completed"], 1);
}
