#![allow(deprecated)] // TODO: move cargo_bin to the cargo_bin_cmd! macro

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `cmux` bound to a throwaway file store
fn cmux(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cmux").unwrap();
    cmd.current_dir(data.path())
        .env_remove("RUST_LOG")
        .env_remove("CLOUDMUX_CONFIG_PATH")
        .env("CLOUDMUX_DATA_DIR", data.path().join("store"))
        .env("CLOUDMUX_DRIVER_LIB_DIR", data.path().join("drivers"))
        .env("CLOUDMUX_STORE", "file")
        .env("CLOUDMUX_LOG_LEVEL", "warn");
    cmd
}

/// Registers the built-in mock driver and one connection named `mock-config`
fn setup_connection(data: &TempDir) {
    cmux(data)
        .args(["driver", "register", "--name", "mock-driver"])
        .args(["--provider", "MOCK", "--lib", "cloudmux-driver-mock"])
        .assert()
        .success();
    cmux(data)
        .args(["credential", "register", "--name", "mock-cred", "--provider", "MOCK"])
        .args(["-k", "MockName=cli-test", "-k", "Secret=hunter2"])
        .assert()
        .success();
    cmux(data)
        .args(["region", "register", "--name", "mock-region", "--provider", "MOCK"])
        .args(["-k", "Region=mock-region-1", "-k", "Zone=mock-region-1a"])
        .assert()
        .success();
    cmux(data)
        .args(["connection", "create", "--name", "mock-config", "--provider", "MOCK"])
        .args(["--driver", "mock-driver", "--credential", "mock-cred"])
        .args(["--region", "mock-region"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock-config"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("cmux").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("driver"))
        .stdout(predicate::str::contains("connection"))
        .stdout(predicate::str::contains("resources"))
        .stdout(predicate::str::contains("delete-csp"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("cmux").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloudmux"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("cmux").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_invalid_resource_kind() {
    let data = TempDir::new().unwrap();
    cmux(&data)
        .args(["resources", "mock-config", "bucket"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown resource kind"));
}

#[test]
fn test_connection_lifecycle() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["--json", "connection", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ConfigName\": \"mock-config\""));

    cmux(&data)
        .args(["connection", "get", "mock-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock-driver"));

    cmux(&data)
        .args(["connection", "delete", "mock-config"])
        .assert()
        .success();

    cmux(&data)
        .args(["connection", "get", "mock-config"])
        .assert()
        .failure();
}

#[test]
fn test_credential_values_are_not_printed() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["credential", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MockName"))
        .stdout(predicate::str::contains("hunter2").not());

    cmux(&data)
        .args(["--json", "credential", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_resources_on_empty_connection() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    let out = cmux(&data)
        .args(["--json", "resources", "mock-config", "vpc"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["ResourceType"], "VPC");
    assert_eq!(value["AllList"]["MappedList"].as_array().unwrap().len(), 0);
    assert_eq!(value["AllList"]["OnlySpiderList"].as_array().unwrap().len(), 0);
    assert_eq!(value["AllList"]["OnlyCSPList"].as_array().unwrap().len(), 0);
}

#[test]
fn test_delete_unknown_name_fails() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["delete", "mock-config", "vpc", "vpc-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_tag_and_get_csp_unknown_targets_fail() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["tag", "add", "mock-config", "vm", "vm-missing", "env=dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    cmux(&data)
        .args(["tag", "add", "mock-config", "vm", "vm-missing", "no-equals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
    cmux(&data)
        .args(["get-csp", "mock-config", "disk", "vol-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_unknown_connection_fails() {
    let data = TempDir::new().unwrap();

    cmux(&data)
        .args(["resources", "nowhere", "vpc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_destroy_empty_connection() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["--json", "destroy", "mock-config", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"IsAllDestroyed\": true"));
}

#[test]
fn test_driver_in_use_cannot_be_deleted() {
    let data = TempDir::new().unwrap();
    setup_connection(&data);

    cmux(&data)
        .args(["driver", "delete", "mock-driver"])
        .assert()
        .failure();

    cmux(&data)
        .args(["driver", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock-driver"));
}
