//! Smoke tests for the groundwork binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn groundwork(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("groundwork").unwrap();
    cmd.env_clear().current_dir(dir.path());
    cmd
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("groundwork").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--env-file"))
        .stdout(predicate::str::contains("--check"));
}

#[test]
fn test_check_fails_without_required_secrets() {
    let dir = TempDir::new().unwrap();
    let mut cmd = groundwork(&dir);
    cmd.arg("--check");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"))
        .stderr(predicate::str::contains("postgres.password"));
}

#[test]
fn test_check_passes_with_secrets_in_environment() {
    let dir = TempDir::new().unwrap();
    let mut cmd = groundwork(&dir);
    cmd.arg("--check")
        .env("POSTGRES__PASSWORD", "pg-secret")
        .env("JWT__SECRET_KEY", "signing-secret")
        .env("PORT", "9090");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.0.0.0:9090"))
        .stdout(predicate::str::contains("pg-secret").not());
}

#[test]
fn test_check_reads_explicit_env_file() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("service.env");
    std::fs::write(
        &env_file,
        "POSTGRES__PASSWORD=pg-secret\nJWT__SECRET_KEY=signing-secret\nHOST=127.0.0.1\n",
    )
    .unwrap();

    let mut cmd = groundwork(&dir);
    cmd.arg("--check").arg("--env-file").arg(&env_file);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:8080"));
}

#[test]
fn test_missing_env_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = groundwork(&dir);
    cmd.arg("--check").arg("--env-file").arg(dir.path().join("absent.env"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load .env file"));
}

#[test]
fn test_blank_signing_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cmd = groundwork(&dir);
    cmd.arg("--check")
        .env("POSTGRES__PASSWORD", "pg-secret")
        .env("JWT__SECRET_KEY", "   ");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("jwt.secret_key"));
}
