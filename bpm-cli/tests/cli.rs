//! End-to-end CLI argument handling: missing flags, missing environment, and
//! malformed invocations. These exercise the binary without a real OCI
//! runtime, since `start`/`stop`/`shell` require `runc` and Linux namespaces
//! that aren't available in a plain test environment.

use assert_cmd::Command;
use predicates::prelude::*;

fn bpm() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bpm"))
}

#[test]
fn bare_invocation_prints_usage_and_exits_1() {
    bpm()
        .env("BPM_BOSH_ROOT", "/tmp")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn start_without_job_flag_reports_hand_written_message() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("bpm.yml");
    std::fs::write(&config, "name: web\nexecutable: /bin/true\nargs: []\n").unwrap();

    bpm()
        .env("BPM_BOSH_ROOT", tmp.path())
        .args(["start", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must specify a job"));
}

#[test]
fn start_without_config_flag_reports_hand_written_message() {
    let tmp = tempfile::tempdir().unwrap();

    bpm()
        .env("BPM_BOSH_ROOT", tmp.path())
        .args(["start", "--job", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must specify a configuration file"));
}

#[test]
fn missing_bosh_root_env_is_reported() {
    bpm()
        .env_remove("BPM_BOSH_ROOT")
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BPM_BOSH_ROOT"));
}

#[test]
fn list_with_no_bundles_prints_nothing_and_succeeds() {
    let tmp = tempfile::tempdir().unwrap();

    bpm()
        .env("BPM_BOSH_ROOT", tmp.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn pid_on_unconfigured_job_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("bpm.yml");
    std::fs::write(&config, "name: web\nexecutable: /bin/true\nargs: []\n").unwrap();

    bpm()
        .env("BPM_BOSH_ROOT", tmp.path())
        .args(["pid", "--job", "web", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn unknown_subcommand_reports_usage() {
    bpm()
        .env("BPM_BOSH_ROOT", "/tmp")
        .args(["frobnicate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized"));
}
