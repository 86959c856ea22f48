//! Tests for error handling and CLI flags.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_help() {
    let t = Test::new();
    t.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reconcile"))
        .stdout(predicate::str::contains("get-secret"));
}

#[test]
fn test_version_flag() {
    let t = Test::new();
    let output = t.cmd().arg("--version").output().unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();
    assert_failure(&t.cmd().arg("unknown-command").output().unwrap());
}

#[test]
fn test_reconcile_requires_id_or_all() {
    let t = Test::new();
    assert_failure(&t.cmd().arg("reconcile").output().unwrap());
    assert_failure(
        &t.cmd()
            .args(["reconcile", "default/app", "--all"])
            .output()
            .unwrap(),
    );
}

#[test]
fn test_invalid_resource_id() {
    let t = Test::new();
    let output = t.cmd().args(["status", "a/b/c"]).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid resource id");
}

#[test]
fn test_status_of_missing_record() {
    let t = Test::new();
    t.cmd()
        .args(["status", "default/ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_malformed_config() {
    let t = Test::new();
    t.write_config("this is not valid toml { [ }");
    let output = t.cmd().args(["status", "default/app"]).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_explicit_config_missing() {
    let t = Test::new();
    let output = t
        .cmd()
        .args(["--config", "nope.toml", "status", "default/app"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to read config file");
}

#[test]
fn test_apply_rejects_unknown_kind() {
    let t = Test::new();
    let path = t.write("cm.json", r#"{"kind":"ConfigMap","metadata":{"name":"x"}}"#);
    let output = t.apply(&path);
    assert_failure(&output);
    assert_stderr_contains(&output, "ConfigMap");
}

#[test]
fn test_json_logs_go_to_stderr() {
    let t = Test::new();
    let output = t
        .keyed()
        .args(["--verbose", "--log-format", "json", "seal", "v"])
        .output()
        .unwrap();
    assert_success(&output);

    let blob = stdout(&output).trim().to_string();
    assert!(!blob.contains('{'));
    assert!(stderr(&output)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()));
}

#[test]
fn test_completions() {
    let t = Test::new();
    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cryptctl"));
}
