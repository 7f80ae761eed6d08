//! CLI Argument Parsing Compatibility Tests
//!
//! These tests verify that command-line arguments are parsed correctly and keep accepting the
//! formats existing scripts use. Adjust them only for intentional, documented changes.

use assert_cmd::Command;
use predicates::prelude::*;

fn rvol() -> Command {
    Command::cargo_bin("rvol").unwrap()
}

/// Test that --help output is generated without errors
#[test]
fn test_help_runs() {
    rvol().arg("--help").assert().success();
}

/// Test --version flag works
#[test]
fn test_version_runs() {
    rvol().arg("--version").assert().success();
}

#[test]
fn test_run_help_lists_option_groups() {
    rvol()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transfer"))
        .stdout(predicate::str::contains("Durability"))
        .stdout(predicate::str::contains("Scheduling"))
        .stdout(predicate::str::contains("--dest-subdir"));
}

#[test]
fn test_run_requires_source_dest_and_config() {
    rvol()
        .args(["run", "--source", "remote:"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dest-subdir"));
}

#[test]
fn test_missing_subcommand_is_rejected() {
    rvol().assert().failure();
}

// ============================================================================
// Value Parsing Tests
// ============================================================================

#[test]
fn test_progress_type_formats() {
    for value in [
        "auto",
        "Auto",
        "progress-bar",
        "ProgressBar",
        "text-updates",
        "TextUpdates",
    ] {
        rvol()
            .args(["run", "--progress-type", value, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn test_report_order_values() {
    for value in ["dispatch", "completion"] {
        rvol()
            .args(["run", "--report-order", value, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn test_invalid_report_order_is_rejected() {
    rvol()
        .args([
            "run",
            "--source",
            "remote:",
            "--dest-subdir",
            "out",
            "--config",
            "rclone.conf",
            "--report-order",
            "random",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_job_timeout_is_rejected() {
    rvol()
        .args([
            "run",
            "--source",
            "remote:",
            "--dest-subdir",
            "out",
            "--config",
            "rclone.conf",
            "--job-timeout",
            "forever",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--job-timeout"));
}

#[test]
fn test_invalid_size_is_rejected() {
    rvol()
        .args([
            "run",
            "--source",
            "remote:",
            "--dest-subdir",
            "out",
            "--config",
            "rclone.conf",
            "--buffer-size",
            "lots",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--buffer-size"));
}

#[test]
fn test_invalid_filter_pattern_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("rclone.conf");
    std::fs::write(&config, "[remote]\n").unwrap();
    rvol()
        .args(["run", "--source", "remote:", "--dest-subdir", "out"])
        .arg("--config")
        .arg(&config)
        .args(["--include", "[unclosed"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid --include pattern"));
}
