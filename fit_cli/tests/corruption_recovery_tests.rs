//! Corruption recovery tests for the `fit` binary.
//!
//! A damaged snapshot, WAL or catalog file must never leave the user unable
//! to work out; at worst saved progress is lost.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").unwrap();
    dir
}

fn fit(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fit"));
    cmd.arg("--data-dir")
        .arg(dir)
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn write_snapshot(dir: &Path, contents: &str) {
    let session_dir = dir.join("session");
    fs::create_dir_all(&session_dir).unwrap();
    fs::write(session_dir.join("fit_active_workout.json"), contents).unwrap();
}

fn wal_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("wal/completed_workouts.wal"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_corrupted_snapshot_reads_as_no_progress() {
    let temp_dir = setup_test_dir();
    write_snapshot(temp_dir.path(), "{ not valid json at all }");

    fit(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workout in progress."));
}

#[test]
fn test_corrupted_snapshot_does_not_block_start() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    write_snapshot(dir, "{\"workout_ref\": \"relax_breathing\", \"phase\": ");

    fit(dir)
        .args(["start", "relax_breathing", "--auto", "--resume", "--no-log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout complete!"));

    assert!(!dir.join("session/fit_active_workout.json").exists());
}

#[test]
fn test_corrupted_snapshot_can_be_discarded() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    write_snapshot(dir, "garbage");

    fit(dir)
        .arg("discard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved progress discarded"));

    assert!(!dir.join("session/fit_active_workout.json").exists());
}

#[test]
fn test_out_of_range_snapshot_is_not_resumed() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // relax_breathing has two exercises; index 7 cannot be resumed
    write_snapshot(
        dir,
        r#"{
            "workout_ref": "relax_breathing",
            "phase": "working",
            "current_exercise_index": 7,
            "remaining_seconds": 30,
            "countdown_remaining": 0,
            "is_running": true,
            "completed_exercises": [],
            "per_exercise_elapsed_seconds": {},
            "total_elapsed_seconds": 0,
            "timestamp": "2026-01-01T10:00:00Z"
        }"#,
    );

    fit(dir)
        .args(["start", "relax_breathing", "--auto", "--resume", "--stop-after", "1"])
        .assert()
        .success();

    let snapshot: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.join("session/fit_active_workout.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(snapshot["phase"], "countdown");
    assert_eq!(snapshot["current_exercise_index"], 0);
}

#[test]
fn test_valid_snapshot_file_is_resumed() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // Last second of the last exercise
    write_snapshot(
        dir,
        r#"{
            "workout_ref": "relax_breathing",
            "phase": "working",
            "current_exercise_index": 1,
            "remaining_seconds": 1,
            "countdown_remaining": 0,
            "is_running": true,
            "completed_exercises": [
                { "name": "Box Breathing", "duration": 120, "met": 1.3 }
            ],
            "per_exercise_elapsed_seconds": { "0": 120, "1": 179 },
            "total_elapsed_seconds": 314,
            "timestamp": "2026-01-01T10:00:00Z"
        }"#,
    );

    fit(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout in progress: relax_breathing"))
        .stdout(predicate::str::contains("Exercise: 2"));

    fit(dir)
        .args(["start", "relax_breathing", "--auto", "--resume"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout complete!"))
        .stdout(predicate::str::contains("Completion: 100%"));

    let lines = wal_lines(dir);
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(entry["total_time"], 315);
    assert_eq!(entry["completed_exercises"][0]["time_spent"], 120);
    assert_eq!(entry["completed_exercises"][1]["time_spent"], 180);
}

#[test]
fn test_corrupted_wal_lines_ignored_by_stats() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    fs::create_dir_all(dir.join("wal")).unwrap();
    fs::write(
        dir.join("wal/completed_workouts.wal"),
        "{ invalid json }\n{ more invalid }\n",
    )
    .unwrap();

    fit(dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workouts: 0"));
}

#[test]
fn test_partial_wal_line_does_not_swallow_next_workout() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // Simulate a crash during an earlier append
    fs::create_dir_all(dir.join("wal")).unwrap();
    let mut file = fs::File::create(dir.join("wal/completed_workouts.wal")).unwrap();
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    fit(dir)
        .args(["start", "relax_breathing", "--auto"])
        .assert()
        .success();

    fit(dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workouts: 1"));
}

#[test]
fn test_empty_wal() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    fs::create_dir_all(dir.join("wal")).unwrap();
    fs::write(dir.join("wal/completed_workouts.wal"), "").unwrap();

    fit(dir)
        .args(["start", "stretch_full_body", "--auto"])
        .assert()
        .success();

    assert_eq!(wal_lines(dir).len(), 1);
}

#[test]
fn test_malformed_catalog_file_is_an_error() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(dir.join("workouts.json"), "[{ broken").unwrap();

    fit(dir).arg("list").assert().failure();
}

#[test]
fn test_workout_without_exercises_is_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(
        dir.join("workouts.json"),
        r#"[{ "id": "empty", "name": "Nothing", "exercises": [] }]"#,
    )
    .unwrap();

    fit(dir)
        .args(["start", "empty", "--auto"])
        .assert()
        .failure();

    assert!(!dir.join("session/fit_active_workout.json").exists());
}

#[test]
fn test_rollup_with_corrupted_lines_keeps_valid_ones() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    fit(dir)
        .args(["start", "relax_breathing", "--auto"])
        .assert()
        .success();

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(dir.join("wal/completed_workouts.wal"))
        .unwrap();
    writeln!(file, "not json").unwrap();
    drop(file);

    fit(dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 workouts to CSV"));
}

#[test]
fn test_list_reports_invalid_user_workouts() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(
        dir.join("workouts.json"),
        r#"[{ "id": "nameless", "name": "Nameless", "exercises": [{ "duration": 30 }] }]"#,
    )
    .unwrap();

    fit(dir)
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("Catalog validation errors"))
        .stderr(predicate::str::contains("nameless"));
}

#[test]
fn test_auto_resume_of_paused_snapshot_finishes() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // Left behind by an interactive resume that was killed while paused
    write_snapshot(
        dir,
        r#"{
            "workout_ref": "relax_breathing",
            "phase": "working",
            "current_exercise_index": 1,
            "remaining_seconds": 1,
            "countdown_remaining": 0,
            "is_running": false,
            "completed_exercises": [
                { "name": "Box Breathing", "duration": 120, "met": 1.3 }
            ],
            "per_exercise_elapsed_seconds": { "0": 120, "1": 179 },
            "total_elapsed_seconds": 314,
            "timestamp": "2026-01-01T10:00:00Z"
        }"#,
    );

    fit(dir)
        .args(["start", "relax_breathing", "--auto", "--resume"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming paused workout."))
        .stdout(predicate::str::contains("Workout complete!"));

    assert!(!dir.join("session/fit_active_workout.json").exists());
    assert_eq!(wal_lines(dir).len(), 1);
}
