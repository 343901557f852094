//! The command-line tool

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use super::common::server;

fn pagewire(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pagewire").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("config.toml"))
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_config_example_is_printed() {
    let dir = TempDir::new().unwrap();
    pagewire(&dir)
        .args(["config", "--example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"))
        .stdout(predicate::str::contains("[transport]"));
}

#[test]
fn test_config_reads_custom_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[transport]\nuser_agent = \"newsbot/2\"\n",
    )
    .unwrap();

    pagewire(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("newsbot/2"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[nonsense]\n").unwrap();

    pagewire(&dir)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn test_relative_url_needs_base() {
    let dir = TempDir::new().unwrap();
    pagewire(&dir)
        .args(["request", "GET", "/echo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --base"));
}

#[test]
fn test_request_prints_payload_and_history() {
    let base = server::spawn_detached();
    let dir = TempDir::new().unwrap();

    pagewire(&dir)
        .args(["request", "GET"])
        .arg(base.join("echo").unwrap().as_str())
        .args(["-d", "q=1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"query\": \"q=1\""))
        .stdout(predicate::str::contains("\"requested_with\": \"XMLHttpRequest\""))
        .stdout(predicate::str::contains("\"cursor\": 1"));
}
