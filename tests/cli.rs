use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn gateway() -> Command {
    let mut cmd = Command::cargo_bin("review-gateway").unwrap();
    cmd.env_remove("REVIEW_GATEWAY_CONFIG")
        .env_remove("REVIEW_GATEWAY_LOG_LEVEL")
        .env_remove("REVIEW_GATEWAY_BIND_ADDRESS");
    cmd
}

#[test]
fn test_cli_version() {
    gateway()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("review-gateway"));
}

#[test]
fn test_cli_help() {
    gateway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("token quota"));
}

#[test]
fn test_cli_estimate() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all("a".repeat(4000).as_bytes()).unwrap();

    gateway()
        .arg("estimate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("3500\n"));
}

#[test]
fn test_cli_estimate_missing_file() {
    gateway()
        .args(["estimate", "/definitely/not/here.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_cli_check_config_prints_effective_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
bind_address = "127.0.0.1:9999"

[rate_limit]
window_secs = 30
"#
    )
    .unwrap();

    gateway()
        .arg("--config")
        .arg(file.path())
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:9999"))
        .stdout(predicate::str::contains("window_secs = 30"));
}

#[test]
fn test_cli_check_config_rejects_invalid() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"loud\"").unwrap();

    gateway()
        .arg("--config")
        .arg(file.path())
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}
