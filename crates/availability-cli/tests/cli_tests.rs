//! Integration tests for the `avail` CLI binary.
//!
//! These run the real binary through `assert_cmd`, covering stdin/stdout
//! piping, file I/O, config overrides and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn weekly_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/weekly.json")
}

fn booked_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/booked.json")
}

fn config_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/config.json")
}

fn avail() -> Command {
    Command::cargo_bin("avail").unwrap()
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command must succeed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn day_slots(week: &Value, day: &str) -> Vec<(String, String)> {
    week[day]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["start"].as_str().unwrap().to_string(),
                s["end"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn pair(start: &str, end: &str) -> (String, String) {
    (start.to_string(), end.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// normalize
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn normalize_merges_touching_slots() {
    let expected = concat!(
        r#"{"monday":[{"day":"monday","start":"09:00","end":"12:00"}],"tuesday":[],"#,
        r#""wednesday":[{"day":"wednesday","start":"14:00","end":"16:00"}],"#,
        r#""thursday":[],"friday":[],"saturday":[],"sunday":[]}"#,
        "\n"
    );

    avail()
        .args(["normalize", "-i", weekly_json_path()])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn normalize_stdin_fills_missing_days() {
    avail()
        .arg("normalize")
        .write_stdin(r#"{"friday":[{"day":"friday","start":"08:00","end":"09:00"}]}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"monday":[],"tuesday":[]"#))
        .stdout(predicate::str::contains(
            r#""friday":[{"day":"friday","start":"08:00","end":"09:00"}]"#,
        ))
        .stdout(predicate::str::contains(r#""sunday":[]}"#));
}

#[test]
fn normalize_writes_output_file() {
    let output_path = "/tmp/avail-test-normalize-output.json";
    let _ = std::fs::remove_file(output_path);

    avail()
        .args(["normalize", "-i", weekly_json_path(), "-o", output_path, "--pretty"])
        .assert()
        .success();

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    let week: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(day_slots(&week, "wednesday"), vec![pair("14:00", "16:00")]);
    assert!(content.contains('\n'), "pretty output spans several lines");

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn normalize_rejects_malformed_json() {
    avail()
        .arg("normalize")
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse availability JSON"));
}

// ─────────────────────────────────────────────────────────────────────────────
// add / edit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn add_slot_to_free_day() {
    let week = stdout_json(avail().args([
        "add", "-i", weekly_json_path(), "--day", "tuesday", "--start", "13:00", "--end", "14:30",
    ]));
    assert_eq!(day_slots(&week, "tuesday"), vec![pair("13:00", "14:30")]);
    assert_eq!(day_slots(&week, "monday"), vec![pair("09:00", "12:00")]);
}

#[test]
fn add_overlapping_slot_is_rejected() {
    avail()
        .args([
            "add", "-i", weekly_json_path(), "--day", "monday", "--start", "11:00", "--end", "13:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Slot rejected"));
}

#[test]
fn add_with_unknown_day_fails() {
    avail()
        .args(["add", "-i", weekly_json_path(), "--day", "funday", "--start", "09:00", "--end", "10:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --day 'funday'"));
}

#[test]
fn edit_remove_snaps_outward_to_the_grid() {
    let week = stdout_json(avail().args([
        "edit", "-i", weekly_json_path(), "--day", "monday", "--from", "10:10", "--to", "10:50",
        "--mode", "remove",
    ]));
    assert_eq!(
        day_slots(&week, "monday"),
        vec![pair("09:00", "10:00"), pair("11:00", "12:00")]
    );
}

#[test]
fn edit_adds_to_several_days_with_config_grid() {
    let week = stdout_json(avail().args([
        "--config", config_json_path(), "edit", "-i", weekly_json_path(), "--day", "tuesday",
        "--day", "thursday", "--from", "09:10", "--to", "09:20",
    ]));
    assert_eq!(day_slots(&week, "tuesday"), vec![pair("09:00", "09:30")]);
    assert_eq!(day_slots(&week, "thursday"), vec![pair("09:00", "09:30")]);
}

#[test]
fn edit_rejects_unsupported_granularity() {
    avail()
        .args([
            "edit", "-i", weekly_json_path(), "--day", "monday", "--from", "09:00", "--to", "10:00",
            "--granularity", "20",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported --granularity"));
}

// ─────────────────────────────────────────────────────────────────────────────
// slots / starts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_for_week_skip_booked_time() {
    let slots = stdout_json(avail().args([
        "slots", "-i", weekly_json_path(), "--booked", booked_json_path(), "--week", "2026-03-18",
        "--tutor", "tutor-7",
    ]));
    let slots = slots.as_array().unwrap();

    let monday: Vec<&str> = slots
        .iter()
        .filter(|s| s["date"] == "2026-03-16")
        .map(|s| s["start"].as_str().unwrap())
        .collect();
    assert_eq!(monday, vec!["09:00", "10:30", "11:00", "11:30"]);

    let wednesday = slots.iter().filter(|s| s["date"] == "2026-03-18").count();
    assert_eq!(wednesday, 4);
    assert_eq!(slots.len(), 8);

    assert_eq!(slots[0]["tutorId"], "tutor-7");
    assert_eq!(slots[0]["durationMinutes"], 30);
    assert_eq!(slots[0]["available"], true);
}

#[test]
fn slots_with_duration_are_combined() {
    let slots = stdout_json(avail().args([
        "slots", "-i", weekly_json_path(), "--booked", booked_json_path(), "--from", "2026-03-16",
        "--duration", "60",
    ]));
    let spans: Vec<(String, String)> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["start"].as_str().unwrap().to_string(),
                s["end"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(spans, vec![pair("10:30", "11:30"), pair("11:00", "12:00")]);
}

#[test]
fn slots_reject_duration_not_offered() {
    avail()
        .args(["slots", "-i", weekly_json_path(), "--from", "2026-03-16", "--duration", "45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("45-minute sessions are not offered"));
}

#[test]
fn slots_require_a_date_range() {
    avail()
        .args(["slots", "-i", weekly_json_path()])
        .assert()
        .failure();
}

#[test]
fn starts_list_times_that_fit() {
    avail()
        .args([
            "starts", "-i", weekly_json_path(), "--booked", booked_json_path(), "--date", "2026-03-16",
            "--duration", "60",
        ])
        .assert()
        .success()
        .stdout("10:30\n11:00\n");
}

#[test]
fn starts_use_configured_default_duration() {
    avail()
        .args([
            "--config", config_json_path(), "starts", "-i", weekly_json_path(), "--booked",
            booked_json_path(), "--date", "2026-03-16",
        ])
        .assert()
        .success()
        .stdout("09:00\n10:30\n11:00\n11:30\n");
}

#[test]
fn starts_on_unavailable_date_print_nothing() {
    avail()
        .args(["starts", "-i", weekly_json_path(), "--date", "2026-03-17", "--duration", "30"])
        .assert()
        .success()
        .stdout("");
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and logging
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_config_file_is_reported() {
    avail()
        .args(["--config", "/nonexistent/avail.json", "normalize", "-i", weekly_json_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn dropped_entries_are_logged_to_stderr() {
    avail()
        .args(["--log-level", "warn", "normalize"])
        .env_remove("RUST_LOG")
        .write_stdin(r#"{"monday":[{"day":"monday","start":"25:00","end":"26:00"}]}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"monday":[]"#))
        .stderr(predicate::str::contains("WARN"));
}
