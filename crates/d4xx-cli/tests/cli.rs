// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors
//
// D4XX CLI Tests
//
// TESTING LAYERS:
//
// Layer 1 (No hardware required):
//   - Help text and command structure
//   - Argument validation and exit codes
//   - Empty discovery root
//
// Layer 3 (Hardware Integration - Requires a D4XX camera):
//   - Camera listing, firmware version, controls
//   - Depth streaming FPS check and metadata CRC check
//
// RUN LAYER 1:
//   cargo test --test cli
//
// RUN LAYER 3 (on hardware):
//   cargo test --test cli -- --ignored --nocapture --test-threads=1

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::env;

/// Helper to create a Command for the d4xx binary
/// Uses D4XX_BIN environment variable if set, otherwise uses cargo run
fn d4xx_cmd() -> Command {
    if let Ok(bin_path) = env::var("D4XX_BIN") {
        Command::new(bin_path)
    } else {
        let mut c = Command::new("cargo");
        c.args(["run", "--quiet", "--bin", "d4xx", "--"]);
        c
    }
}

const EMPTY_ROOT: &str = "/nonexistent/d4xx-cli-test";

// =============================================================================
// Layer 1: Help and structure
// =============================================================================

#[test]
fn test_cli_help() {
    d4xx_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("D4XX CLI"))
        .stdout(predicate::str::contains("cameras"))
        .stdout(predicate::str::contains("controls"))
        .stdout(predicate::str::contains("fw-version"))
        .stdout(predicate::str::contains("stream"))
        .stdout(predicate::str::contains("metadata"));
}

#[test]
fn test_cli_version() {
    d4xx_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("d4xx"));
}

#[test]
fn test_stream_help() {
    d4xx_cmd()
        .args(["stream", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--resolution"))
        .stdout(predicate::str::contains("--fps"))
        .stdout(predicate::str::contains("--frames"))
        .stdout(predicate::str::contains("--tolerance"));
}

#[test]
fn test_metadata_help() {
    d4xx_cmd()
        .args(["metadata", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CRC"))
        .stdout(predicate::str::contains("--min-pass"))
        .stdout(predicate::str::contains("--dump"));
}

#[test]
fn test_controls_help() {
    d4xx_cmd()
        .args(["controls", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--role"))
        .stdout(predicate::str::contains("ID=VALUE"));
}

#[test]
fn test_unknown_subcommand() {
    d4xx_cmd().arg("reload-driver").assert().failure().code(2);
}

// =============================================================================
// Layer 1: Argument validation (fails before any device is touched)
// =============================================================================

#[test]
fn test_stream_rejects_single_frame() {
    d4xx_cmd()
        .args(["stream", "--frames", "1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("at least 2 frames"));
}

#[test]
fn test_stream_rejects_bad_resolution() {
    d4xx_cmd()
        .args(["stream", "--resolution", "848by480"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid resolution"));
}

#[test]
fn test_stream_rejects_unknown_role() {
    d4xx_cmd()
        .args(["stream", "--role", "lidar"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Unknown role"));
}

#[test]
fn test_stream_rejects_imu() {
    d4xx_cmd()
        .args(["stream", "--role", "imu"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_stream_rejects_bad_fourcc() {
    d4xx_cmd()
        .args(["stream", "--format", "TOOLONG"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("FOURCC"));
}

#[test]
fn test_controls_rejects_unknown_role() {
    d4xx_cmd()
        .args(["controls", "--role", "rgb"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_fw_version_rejects_bad_minimum() {
    d4xx_cmd()
        .args(["fw-version", "--min", "5.16"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid firmware version"));
}

#[test]
fn test_metadata_rejects_bad_resolution() {
    d4xx_cmd()
        .args(["metadata", "--resolution", "huge"])
        .assert()
        .failure()
        .code(2);
}

// =============================================================================
// Layer 1: Empty discovery root
// =============================================================================

#[test]
fn test_cameras_empty_root() {
    d4xx_cmd()
        .args(["cameras", "--root", EMPTY_ROOT])
        .assert()
        .failure()
        .code(3)
        .stdout(predicate::str::contains("No D4XX cameras found"));
}

#[test]
fn test_cameras_empty_root_json() {
    let output = d4xx_cmd()
        .args(["--json", "--quiet", "cameras", "--root", EMPTY_ROOT])
        .assert()
        .failure()
        .code(3)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["cameras"].as_array().map(Vec::len), Some(0));
}

// =============================================================================
// Layer 3: Hardware
// =============================================================================

#[test]
#[ignore = "requires a D4XX camera"]
#[serial]
fn test_cameras_lists_depth_node() {
    d4xx_cmd()
        .args(["cameras", "--formats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depth"))
        .stdout(predicate::str::contains("Z16"));
}

#[test]
#[ignore = "requires a D4XX camera"]
#[serial]
fn test_fw_version_json() {
    let output = d4xx_cmd()
        .args(["--json", "fw-version"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let version = json["version"].as_str().unwrap();
    assert_eq!(version.split('.').count(), 4);
    assert!(json["raw"].as_str().unwrap().starts_with("0x"));
}

#[test]
#[ignore = "requires a D4XX camera"]
#[serial]
fn test_controls_lists_laser_power() {
    d4xx_cmd()
        .args(["controls", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0x009a4001"));
}

#[test]
#[ignore = "requires a D4XX camera"]
#[serial]
fn test_depth_stream_check() {
    let output = d4xx_cmd()
        .args(["--json", "stream", "--frames", "60"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["frames"], 60);
    assert_eq!(json["monotonic"], true);
}

#[test]
#[ignore = "requires a D4XX camera"]
#[serial]
fn test_metadata_crc_check() {
    d4xx_cmd()
        .args(["metadata", "--frames", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CRC valid"));
}
