//! Integration tests for the desglose binary (Sprint 3)
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const RUNS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/runs");

fn desglose() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("desglose");
    cmd.arg("--runs-dir").arg(RUNS_DIR).arg("--namespace").arg("demo");
    cmd
}

// ============================================================================
// Flat profile
// ============================================================================

#[test]
fn test_flat_text_report() {
    desglose()
        .arg("baseline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Flat profile for baseline"))
        .stdout(predicate::str::contains("Function Name"))
        .stdout(predicate::str::contains("Incl. Wall Time (microsecs)"))
        .stdout(predicate::str::contains("main()"))
        .stdout(predicate::str::contains("Displaying top 4 functions."));
}

#[test]
fn test_flat_report_truncated() {
    desglose()
        .args(["-n", "1", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main()"))
        .stdout(predicate::str::contains("render").not());
}

#[test]
fn test_flat_report_all_rows() {
    desglose()
        .args(["--length", "-1", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Displaying all 4 functions."));
}

#[test]
fn test_flat_json_report() {
    let output = desglose()
        .args(["--format", "json", "-s", "excl_wt", "baseline"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["format"], "desglose-json-v1");
    assert_eq!(json["mode"], "flat");
    assert_eq!(json["sort"], "excl_wt");
    assert_eq!(json["length"], 100);
    assert_eq!(json["rows"][0][0], "parse");
    assert_eq!(json["summary"]["calls"], 19);
}

#[test]
fn test_flat_csv_report() {
    desglose()
        .args(["--format", "csv", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Function Name,Calls,Calls%,"))
        .stdout(predicate::str::contains("\nmain(),1,5.3,1000,100.0,100,10.0,"));
}

#[test]
fn test_unknown_sort_key_reports_fallback() {
    desglose()
        .args(["--sort", "pmu", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sorted by Incl. Wall Time (microsecs)"))
        .stdout(predicate::str::contains("data anomalies repaired"));
}

// ============================================================================
// Diff report
// ============================================================================

#[test]
fn test_diff_text_report() {
    desglose()
        .args(["baseline", "candidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Diff report for baseline -> candidate"))
        .stdout(predicate::str::contains("cache_warm"))
        .stdout(predicate::str::contains("n/a"));
}

#[test]
fn test_diff_json_report() {
    let output = desglose()
        .args(["--format", "json", "baseline", "candidate"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "diff");
    assert_eq!(json["runs"], serde_json::json!(["baseline", "candidate"]));
    assert_eq!(json["summary"]["metrics"]["wt"]["delta"], 500.0);
    assert_eq!(json["summary"]["metrics"]["wt"]["percent"], 50.0);

    let rows = json["rows"].as_array().unwrap();
    let warm = rows.iter().find(|row| row[0] == "cache_warm").unwrap();
    assert!(warm[8].is_null());
}

// ============================================================================
// Summary
// ============================================================================

#[test]
fn test_summary_text() {
    desglose()
        .args(["--summary", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary of baseline"))
        .stdout(predicate::str::contains("1000 microsecs"))
        .stdout(predicate::str::contains("2000 bytes"));
}

#[test]
fn test_summary_diff_csv() {
    desglose()
        .args(["--summary", "--format", "csv", "baseline", "candidate"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "metric,baseline,candidate,delta,delta_perc\n",
        ))
        .stdout(predicate::str::contains("wt,1000,1500,500,50.0"));
}

#[test]
fn test_list_runs() {
    desglose()
        .arg("--list")
        .assert()
        .success()
        .stdout("baseline\ncandidate\n");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_sets_defaults() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("desglose.toml");
    fs::write(
        &config,
        format!(
            "default_sort = \"fn\"\nlength = 2\nruns_dir = {:?}\nnamespace = \"demo\"\n",
            RUNS_DIR
        ),
    )
    .unwrap();

    let output = assert_cmd::cargo::cargo_bin_cmd!("desglose")
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "baseline"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sort"], "fn");
    assert_eq!(json["length"], 2);
    assert_eq!(json["rows"][0][0], "load");
}

#[test]
fn test_cli_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("desglose.toml");
    fs::write(&config, "default_sort = \"fn\"\nlength = 2\n").unwrap();

    let output = desglose()
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "-s", "wt", "-n", "3", "baseline"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sort"], "wt");
    assert_eq!(json["length"], 3);
}

#[test]
fn test_default_config_discovered_in_working_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("desglose.toml"), "length = 1\n").unwrap();

    desglose()
        .current_dir(dir.path())
        .arg("baseline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Displaying top 1 functions."));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "percent_precision = 99\n").unwrap();

    desglose()
        .arg("--config")
        .arg(&config)
        .arg("baseline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_run_fails() {
    desglose()
        .arg("does-not-exist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn test_undecodable_run_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.xhprof"), "{not json").unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("desglose")
        .arg("--runs-dir")
        .arg(dir.path())
        .arg("broken")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken"));
}

#[test]
fn test_path_like_run_id_rejected() {
    desglose()
        .arg("../secrets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid run id"));
}

#[test]
fn test_requires_run_argument() {
    assert_cmd::cargo::cargo_bin_cmd!("desglose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("RUN"));
}

#[test]
fn test_debug_logs_to_stderr() {
    desglose()
        .args(["--debug", "baseline"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Decoded run baseline"));
}
