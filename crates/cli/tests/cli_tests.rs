//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "guardian-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Workload Guardian"),
        "Should show app name"
    );
    assert!(stdout.contains("anomalies"), "Should show anomalies command");
    assert!(stdout.contains("act"), "Should show act command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "guardian-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("guardianctl"), "Should show binary name");
}

/// Test anomalies subcommand help
#[test]
fn test_anomalies_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "guardian-cli", "--", "anomalies", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Anomalies help should succeed");
    assert!(
        stdout.contains("--namespace"),
        "Should show namespace option"
    );
    assert!(stdout.contains("--top"), "Should show top option");
}

/// Test act subcommand help lists every action kind
#[test]
fn test_act_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "guardian-cli", "--", "act", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Act help should succeed");
    assert!(stdout.contains("rolling-restart"), "Should show rolling-restart");
    assert!(stdout.contains("scale-replicas"), "Should show scale-replicas");
    assert!(stdout.contains("pod-restart"), "Should show pod-restart");
    assert!(
        stdout.contains("container-restart"),
        "Should show container-restart"
    );
}

/// Test scale-replicas requires its parameters
#[test]
fn test_scale_replicas_requires_parameters() {
    let output = Command::new("cargo")
        .args(["run", "-p", "guardian-cli", "--", "act", "scale-replicas"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        !output.status.success(),
        "Missing required arguments should fail"
    );
    assert!(stderr.contains("--namespace"), "Should name namespace");
    assert!(stderr.contains("--replicas"), "Should name replicas");
}

/// Test act subcommand advertises the execute flag
#[test]
fn test_act_pod_restart_help() {
    let output = Command::new("cargo")
        .args([
            "run",
            "-p",
            "guardian-cli",
            "--",
            "act",
            "pod-restart",
            "--help",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Pod-restart help should succeed");
    assert!(stdout.contains("--execute"), "Should show execute flag");
    assert!(stdout.contains("--pod"), "Should show pod option");
}
