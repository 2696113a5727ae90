//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `idem` binary against the in-memory
//! backend and verify exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const INPUT: &str = r#"{"name": "John Doe Dorian", "age": 43}"#;

fn idem() -> Command {
    let mut cmd = cargo_bin_cmd!("idem");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    idem()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("At-most-once execution toolkit"));
}

#[test]
fn version_exits_0() {
    idem()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("idem"));
}

#[test]
fn table_help_lists_actions() {
    idem()
        .args(["table", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("recreate"));
}

#[test]
fn missing_subcommand_fails() {
    idem().assert().failure();
}

// ──────────────────────────────────────────────
// 2. key
// ──────────────────────────────────────────────

#[test]
fn key_is_64_hex_chars() {
    let key = stdout_of(idem().args(["key", "my-use-case", "--input", INPUT]));
    let key = key.trim();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn key_ignores_field_order_and_whitespace() {
    let a = stdout_of(idem().args(["key", "my-use-case", "--input", INPUT]));
    let b = stdout_of(idem().args([
        "key",
        "my-use-case",
        "--input",
        r#"{ "age":43,"name":"John Doe Dorian" }"#,
    ]));
    assert_eq!(a, b);
}

#[test]
fn key_differs_between_use_cases() {
    let a = stdout_of(idem().args(["key", "create-order", "--input", INPUT]));
    let b = stdout_of(idem().args(["key", "refund-order", "--input", INPUT]));
    assert_ne!(a, b);
}

#[test]
fn key_reads_input_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.json");
    fs::write(&path, INPUT).unwrap();

    let inline = stdout_of(idem().args(["key", "my-use-case", "--input", INPUT]));
    let from_file = stdout_of(
        idem()
            .args(["key", "my-use-case", "--input-file"])
            .arg(&path),
    );
    assert_eq!(inline, from_file);
}

#[test]
fn key_json_output() {
    let out = stdout_of(idem().args(["--output", "json", "key", "uc", "--input", "[1,2,3]"]));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["use_case"], "uc");
    assert_eq!(v["key"].as_str().unwrap().len(), 64);
}

#[test]
fn key_without_input_fails() {
    idem()
        .args(["key", "uc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn key_with_malformed_input_fails() {
    idem()
        .args(["key", "uc", "--input", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input JSON"));
}

// ──────────────────────────────────────────────
// 3. inspect / release on the memory backend
// ──────────────────────────────────────────────

#[test]
fn inspect_on_fresh_memory_store_finds_nothing() {
    idem()
        .args(["inspect", "my-use-case", "--input", INPUT])
        .assert()
        .success()
        .stdout(predicate::str::contains("no record for my-use-case/"));
}

#[test]
fn inspect_json_reports_null_status() {
    let out = stdout_of(idem().args([
        "--output",
        "json",
        "inspect",
        "my-use-case",
        "--input",
        INPUT,
    ]));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(v["status"].is_null());
}

#[test]
fn release_of_absent_record_succeeds() {
    idem()
        .args(["release", "my-use-case", "--input", INPUT])
        .assert()
        .success()
        .stdout(predicate::str::contains("released my-use-case/"));
}

#[test]
fn release_quiet_prints_nothing() {
    idem()
        .args(["--quiet", "release", "my-use-case", "--input", INPUT])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 4. demo
// ──────────────────────────────────────────────

#[test]
fn demo_runs_both_scenarios_on_memory_backend() {
    idem()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("[A] begin"))
        .stdout(predicate::str::contains("AlreadyInProgress"))
        .stdout(predicate::str::contains("AlreadyDone("))
        .stdout(predicate::str::contains("payment declined"))
        .stdout(predicate::str::contains("[B] begin"));
}

#[test]
fn demo_json_output_lists_steps() {
    let out = stdout_of(idem().args(["--output", "json", "demo"]));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["ok"], true);

    let outcomes: Vec<&str> = v["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["outcome"].as_str().unwrap())
        .collect();
    assert_eq!(outcomes[0], "Started");
    assert_eq!(outcomes[1], "AlreadyInProgress");
    assert!(outcomes[3].starts_with("AlreadyDone("));
    assert_eq!(outcomes.last(), Some(&"Started"));
}

// ──────────────────────────────────────────────
// 5. Settings
// ──────────────────────────────────────────────

#[test]
fn demo_honours_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idem.toml");
    fs::write(&path, "[ttl]\nin_progress_secs = 5\ncompleted_secs = 60\n").unwrap();

    idem()
        .arg("--config")
        .arg(&path)
        .arg("demo")
        .assert()
        .success();
}

#[test]
fn missing_config_file_fails() {
    idem()
        .args(["--config", "does/not/exist.toml", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does/not/exist.toml"));
}

#[test]
fn malformed_config_fails_with_json_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idem.toml");
    fs::write(&path, "[ttl]\nin_progress_secs = \"soon\"\n").unwrap();

    let out = idem()
        .args(["--output", "json", "--config"])
        .arg(&path)
        .arg("demo")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let v: serde_json::Value = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();
    assert!(v["error"].as_str().unwrap().contains("invalid config"));
}

#[test]
fn zero_in_progress_ttl_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idem.toml");
    fs::write(&path, "[ttl]\nin_progress_secs = 0\n").unwrap();

    idem()
        .arg("--config")
        .arg(&path)
        .arg("demo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("in_progress_ttl must be greater than zero"));
}
