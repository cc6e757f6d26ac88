//! CLI integration tests

use std::process::{Command, Output};

fn farmeye(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "farmeye-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = farmeye(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("FarmEye"), "Should show app name");
    assert!(stdout.contains("alerts"), "Should show alerts command");
    assert!(stdout.contains("cameras"), "Should show cameras command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("detection"), "Should show detection command");
    assert!(stdout.contains("sound"), "Should show sound command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = farmeye(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("farmeye"), "Should show binary name");
}

/// Test alerts subcommand help
#[test]
fn test_alerts_help() {
    let output = farmeye(&["alerts", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Alerts help should succeed");
    assert!(stdout.contains("--category"), "Should show category option");
    assert!(stdout.contains("--limit"), "Should show limit option");
    assert!(stdout.contains("clear"), "Should show clear subcommand");
}

/// Test cameras subcommand help
#[test]
fn test_cameras_help() {
    let output = farmeye(&["cameras", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Cameras help should succeed");
    assert!(stdout.contains("list"), "Should show list subcommand");
    assert!(stdout.contains("toggle"), "Should show toggle subcommand");
    assert!(stdout.contains("snapshot"), "Should show snapshot subcommand");
}

/// Test detection toggle help lists the switch values
#[test]
fn test_detection_help() {
    let output = farmeye(&["detection", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Detection help should succeed");
    assert!(stdout.contains("on"), "Should show on value");
    assert!(stdout.contains("off"), "Should show off value");
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = farmeye(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("FARMEYE_API_URL"), "Should show env var");
}

/// Test invalid switch value error handling
#[test]
fn test_invalid_switch_value() {
    let output = farmeye(&["sound", "loud"]);

    assert!(!output.status.success(), "Invalid value should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value"), "Should show error message");
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = farmeye(&["cameras", "toggle"]);

    assert!(!output.status.success(), "Missing argument should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test that an unreachable agent is reported as an error
#[test]
fn test_unreachable_agent() {
    let output = farmeye(&["--api-url", "http://127.0.0.1:1", "status"]);

    assert!(!output.status.success(), "Unreachable agent should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to send request"));
}
