//! Binary-level tests for the `confidant` CLI

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{companion_json, temp_config_file};

fn confidant(identity_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("confidant").expect("binary should build");
    cmd.env_remove("CONFIDANT_API_URL")
        .env("CONFIDANT_IDENTITY_BACKEND", "sled")
        .env("CONFIDANT_IDENTITY_PATH", identity_dir.path().join("identity"))
        .args(["--config", "/nonexistent/config.yaml"]);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("command should run");
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("confidant")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("companions"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("identity"));
}

#[test]
fn test_identity_show_is_stable_across_runs() {
    let dir = TempDir::new().unwrap();

    let first = stdout_of(confidant(&dir).args(["identity", "show"]));
    let second = stdout_of(confidant(&dir).args(["identity", "show"]));

    assert!(first.trim().starts_with("guest_"));
    assert_eq!(first, second);
}

#[test]
fn test_identity_reset_mints_new_token() {
    let dir = TempDir::new().unwrap();

    let before = stdout_of(confidant(&dir).args(["identity", "show"]));
    confidant(&dir)
        .args(["identity", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared"));
    let after = stdout_of(confidant(&dir).args(["identity", "show"]));

    assert_ne!(before.trim(), after.trim());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_config_dir, config_path) = temp_config_file("health:\n  interval_seconds: 0\n");

    Command::cargo_bin("confidant")
        .unwrap()
        .env("CONFIDANT_IDENTITY_BACKEND", "memory")
        .env("CONFIDANT_IDENTITY_PATH", dir.path())
        .arg("--config")
        .arg(&config_path)
        .args(["identity", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval_seconds"));
}

#[tokio::test]
async fn test_health_reports_online() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    confidant(&dir)
        .args(["--api-url", &server.uri(), "health"])
        .assert()
        .success()
        .stdout(predicate::str::contains("online"));
}

#[tokio::test]
async fn test_health_reports_offline_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    confidant(&dir)
        .args(["--api-url", &server.uri(), "health"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("offline"));
}

#[tokio::test]
async fn test_companions_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([companion_json("c1", "sophia", "Sophia")])),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = stdout_of(confidant(&dir).args(["--api-url", &server.uri(), "companions", "list", "--json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[0]["slug"], "sophia");
    assert_eq!(parsed[0]["_id"], "c1");
}
