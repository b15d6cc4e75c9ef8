//! Integration tests for the `capellix-cli` binary.
//!
//! These run the binary via `assert_cmd` and stick to commands that behave
//! the same with or without a controller attached.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn cli() -> assert_cmd::Command {
    cargo_bin_cmd!("capellix-cli")
}

/// Config path inside a fresh temp dir; the file itself does not exist.
fn temp_config() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn cli_help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("capellix-cli"));
}

#[test]
fn cli_version_prints_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_config_json_produces_valid_json() {
    let (_dir, path) = temp_config();
    let output = cli()
        .args(["--json", "--config", path_arg(&path), "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value =
        serde_json::from_slice(&output).expect("config --json should produce valid JSON");
    assert!(json["settings"].is_object());
    assert_eq!(json["config_file_exists"], false);
    assert_eq!(json["settings"]["color"], "#FFFFFF");
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn cli_config_reports_validation_errors() {
    let (_dir, path) = temp_config();
    std::fs::write(&path, "color = \"chartreuse-ish\"\n").unwrap();
    let output = cli()
        .args(["--json", "--config", path_arg(&path), "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["config_file_exists"], true);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("color"));
}

#[test]
fn cli_config_human_output_shows_settings() {
    let (_dir, path) = temp_config();
    cli()
        .args(["--config", path_arg(&path), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings:"))
        .stdout(predicate::str::contains("not found, using defaults"));
}

#[test]
fn cli_config_init_writes_file() {
    let (_dir, path) = temp_config();
    cli()
        .args(["--config", path_arg(&path), "config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# capellix configuration."));
    assert!(contents.contains("keepalive_interval_ms = 1000"));
}

// ── --verbose flag ──

#[test]
fn cli_verbose_flag_accepted() {
    let (_dir, path) = temp_config();
    cli()
        .args(["-v", "--config", path_arg(&path), "config"])
        .assert()
        .success();
}

#[test]
fn cli_verbose_long_flag_accepted() {
    let (_dir, path) = temp_config();
    cli()
        .args(["--verbose", "--config", path_arg(&path), "config"])
        .assert()
        .success();
}

// ── Device commands ──

#[test]
fn cli_devices_succeeds() {
    cli().arg("devices").assert().success();
}

#[test]
fn cli_devices_json_is_valid() {
    let output = cli()
        .args(["--json", "devices"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(json["count"].is_u64());
    assert!(json["devices"].is_array());
}

#[test]
fn cli_solid_rejects_invalid_color() {
    let (_dir, path) = temp_config();
    cli()
        .args(["--config", path_arg(&path), "solid", "not-a-color"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn cli_zones_rejects_invalid_fan_color() {
    let (_dir, path) = temp_config();
    cli()
        .args(["--config", path_arg(&path), "zones", "--fans", "#12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn cli_solid_help_succeeds() {
    cli()
        .args(["solid", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--duration"));
}

#[test]
fn cli_zones_help_succeeds() {
    cli()
        .args(["zones", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pump"))
        .stdout(predicate::str::contains("--fans"));
}

#[test]
fn cli_off_help_succeeds() {
    cli()
        .args(["off", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restore hardware lighting"));
}

#[test]
fn cli_status_help_succeeds() {
    cli()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("firmware"));
}
