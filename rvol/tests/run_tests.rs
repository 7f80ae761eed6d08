use std::fs;

use predicates::prelude::*;

mod support;

use support::Fixture;

#[test]
fn test_all_files_copied() {
    let fixture = Fixture::new();
    fixture.remote_file("photos/a.txt", "alpha");
    fixture.remote_file("photos/b.txt", "bravo");

    fixture
        .run("fake:photos")
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 2"))
        .stdout(predicate::str::contains("succeeded: 2"))
        .stdout(predicate::str::contains("failed: 0"))
        .stdout(predicate::str::contains("timed out: 0"))
        .stdout(predicate::str::contains("pending: 0"))
        .stdout(predicate::str::contains("status: AllSucceeded"))
        .stderr(predicate::str::contains("listed: a.txt"))
        .stderr(predicate::str::contains("copied: fake:photos/a.txt -> "))
        .stderr(predicate::str::contains("summary:"))
        .stderr(predicate::str::contains("succeeded: 2"))
        .stderr(predicate::str::contains("status: AllSucceeded"));

    assert_eq!(fs::read_to_string(fixture.dest("a.txt")).unwrap(), "alpha");
    assert_eq!(fs::read_to_string(fixture.dest("b.txt")).unwrap(), "bravo");
}

#[test]
fn test_failed_copy_is_reported_and_others_succeed() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "FAIL");
    fixture.remote_file("b.txt", "bravo");

    fixture
        .run("fake:")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("total: 2"))
        .stdout(predicate::str::contains("succeeded: 1"))
        .stdout(predicate::str::contains("failed: 1"))
        .stdout(predicate::str::contains("status: PartialFailure"))
        .stderr(predicate::str::contains("failed: fake:a.txt -> "))
        .stderr(predicate::str::contains("simulated transfer failure"));

    assert!(!fixture.dest("a.txt").exists());
    assert_eq!(fs::read_to_string(fixture.dest("b.txt")).unwrap(), "bravo");
}

#[test]
fn test_empty_listing_succeeds_with_zero_jobs() {
    let fixture = Fixture::new();
    fixture.remote_dir("empty");

    fixture
        .run("fake:empty")
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 0"))
        .stdout(predicate::str::contains("status: AllSucceeded"))
        .stderr(predicate::str::contains("copied:").not())
        .stderr(predicate::str::contains("failed: fake:").not())
        .stderr(predicate::str::contains("total: 0"));

    assert!(!fixture.calls().contains("copyto"));
}

#[test]
fn test_missing_config_fails_before_listing() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");

    fixture
        .run_with_config("fake:", &fixture.volume.join("missing.conf"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("config file not found"));

    assert!(fixture.calls().is_empty());
}

#[test]
fn test_listing_failure_dispatches_nothing() {
    let fixture = Fixture::new();

    fixture
        .run("fake:missing")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("directory not found"))
        .stderr(predicate::str::contains("copied:").not());

    assert!(!fixture.calls().contains("copyto"));
}

#[test]
fn test_rerun_is_idempotent() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");
    fixture.remote_file("b.txt", "bravo");

    for _ in 0..2 {
        fixture
            .run("fake:")
            .assert()
            .success()
            .stdout(predicate::str::contains("status: AllSucceeded"));
        assert_eq!(fs::read_to_string(fixture.dest("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(fixture.dest("b.txt")).unwrap(), "bravo");
    }
}

#[test]
fn test_recursive_listing_with_filters() {
    let fixture = Fixture::new();
    fixture.remote_file("docs/a.txt", "alpha");
    fixture.remote_file("docs/nested/b.txt", "bravo");
    fixture.remote_file("docs/nested/c.log", "charlie");

    fixture
        .run("fake:docs")
        .args(["--recursive", "--exclude", "*.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 2"));

    assert_eq!(
        fs::read_to_string(fixture.dest("nested/b.txt")).unwrap(),
        "bravo"
    );
    assert!(!fixture.dest("nested/c.log").exists());
}

#[test]
fn test_json_summary() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "FAIL");
    fixture.remote_file("b.txt", "bravo");

    let output = fixture
        .run("fake:")
        .args(["--summary-format", "json", "--report-order", "completion"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["status"], "PartialFailure");
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["failures"][0]["name"], "a.txt");
    assert_eq!(summary["failures"][0]["source"], "fake:a.txt");
}

#[test]
fn test_dry_run_copies_nothing() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");

    let expected = format!("fake:a.txt -> {}", fixture.dest("a.txt").display());
    fixture
        .run("fake:")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));

    assert!(!fixture.dest("a.txt").exists());
    assert!(!fixture.calls().contains("copyto"));
}

#[test]
fn test_slow_job_times_out() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");
    fixture.remote_file("slow.txt", "SLEEP");

    let slow_dest = fixture.dest("slow.txt").display().to_string();
    fixture
        .run("fake:")
        .args(["--job-timeout", "500ms"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("succeeded: 1"))
        .stdout(predicate::str::contains("timed out: 1"))
        .stdout(predicate::str::contains(format!(
            "timed out jobs:\n  fake:slow.txt -> {slow_dest}"
        )))
        .stderr(predicate::str::contains("timed out: fake:slow.txt -> "));

    let output = fixture
        .run("fake:")
        .args(["--job-timeout", "300ms", "--summary-format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["timed_out"], 1);
    assert_eq!(summary["timed_out_jobs"][0]["name"], "slow.txt");
    assert_eq!(summary["timed_out_jobs"][0]["source"], "fake:slow.txt");
    assert_eq!(summary["timed_out_jobs"][0]["dest"], slow_dest.as_str());
    assert!(summary["failures"].as_array().unwrap().is_empty());
}

#[test]
fn test_commit_failure_fails_job() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");

    fixture
        .run("fake:")
        .args(["--commit-command", "false"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed: 1"))
        .stderr(predicate::str::contains("commit failed"));

    // bytes were copied but the job still counts as failed
    assert!(fixture.dest("a.txt").exists());
}

#[test]
fn test_tool_settings_reach_the_tool() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");

    fixture
        .run("fake:")
        .args(["--retries", "3", "--extra-args", "--checksum --fast-list"])
        .assert()
        .success();

    let calls = fixture.calls();
    let copy = calls
        .lines()
        .find(|line| line.starts_with("copyto"))
        .unwrap();
    assert!(copy.contains("--retries 3"));
    assert!(copy.contains("--transfers 1"));
    assert!(copy.ends_with("--checksum --fast-list"));
    assert!(calls.contains("lsf --files-only fake:"));
}

#[test]
fn test_config_path_tilde_expansion() {
    let fixture = Fixture::new();
    fixture.remote_file("a.txt", "alpha");
    let home = fixture.config.parent().unwrap().to_path_buf();

    fixture
        .run_with_config("fake:", std::path::Path::new("~/rclone.conf"))
        .env("HOME", &home)
        .assert()
        .success();

    assert!(fixture.dest("a.txt").exists());
}

#[test]
fn test_max_files_limits_jobs() {
    let fixture = Fixture::new();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fixture.remote_file(name, name);
    }

    fixture
        .run("fake:")
        .args(["--max-files", "2", "--max-concurrent-jobs", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 2"));
}
