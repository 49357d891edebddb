// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Firmware version readout and check.

use crate::error::CliError;
use crate::utils::{open_role, select_camera};
use clap::Args as ClapArgs;
use d4xx::controls::FirmwareVersion;
use d4xx::discovery::Role;
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera position in discovery order
    #[arg(short, long, default_value_t = 0)]
    camera: usize,

    /// Fail unless the camera reports at least this version (a.b.c.d)
    #[arg(long, value_name = "VERSION")]
    min: Option<String>,
}

#[derive(Debug, Serialize)]
struct FwOutput {
    device: String,
    version: String,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<String>,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing fw-version command: {:?}", args);

    let required = args.min.as_deref().map(parse_version).transpose()?;

    let camera = select_camera(args.camera)?;
    let dev = open_role(&camera, Role::Depth)?;
    let fw = dev.firmware_version()?;

    let output = FwOutput {
        device: dev.path().display().to_string(),
        version: fw.to_string(),
        raw: format!("0x{:08x}", fw.raw()),
        required: required.map(|v| v.to_string()),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        println!("{}: firmware {} ({})", output.device, output.version, output.raw);
    }

    match required {
        Some(min) if fw < min => Err(CliError::CheckFailed(format!(
            "firmware {} is older than {}",
            fw, min
        ))),
        _ => Ok(()),
    }
}

/// Parse a dotted "major.minor.patch.build" version
fn parse_version(s: &str) -> Result<FirmwareVersion, CliError> {
    let invalid = || CliError::InvalidArgs(format!("Invalid firmware version: {}", s));

    let parts = s
        .split('.')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| invalid())?;
    let bytes: [u8; 4] = parts.try_into().map_err(|_| invalid())?;

    Ok(FirmwareVersion::from_raw(i32::from_be_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let v = parse_version("5.16.0.1").unwrap();
        assert_eq!((v.major, v.minor, v.patch, v.build), (5, 16, 0, 1));
        assert_eq!(v.to_string(), "5.16.0.1");
        assert!(parse_version("5.16.0").is_err());
        assert!(parse_version("5.16.0.1.2").is_err());
        assert!(parse_version("5.256.0.1").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(parse_version("5.15.1.0").unwrap() < parse_version("5.16.0.1").unwrap());
    }
}
