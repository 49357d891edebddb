// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Control listing and single-control get/set.

use crate::error::CliError;
use crate::utils::{open_role, parse_role, select_camera};
use clap::Args as ClapArgs;
use d4xx::controls::{ControlDescriptor, ControlType, V4L2_CTRL_FLAG_WRITE_ONLY};
use d4xx::device::DeviceHandle;
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera position in discovery order
    #[arg(short, long, default_value_t = 0)]
    camera: usize,

    /// Node role to query (depth, depth-md, color, color-md, ir, imu)
    #[arg(short, long, default_value = "depth")]
    role: String,

    /// Set a control before listing, as ID=VALUE (ID in hex or decimal)
    #[arg(long, value_name = "ID=VALUE")]
    set: Option<String>,

    /// Include read-only and inactive controls
    #[arg(short, long)]
    all: bool,
}

#[derive(Debug, Serialize)]
struct ControlInfo {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    ctrl_type: String,
    minimum: i32,
    maximum: i32,
    step: i32,
    default: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<i32>,
    read_only: bool,
    inactive: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing controls command: {:?}", args);

    let role = parse_role(&args.role)?;
    let camera = select_camera(args.camera)?;
    let dev = open_role(&camera, role)?;

    if let Some(assignment) = &args.set {
        let (id, value) = parse_assignment(assignment)?;
        let stored = dev.set_control(id, value)?;
        if stored != value {
            log::warn!(
                "control 0x{:08x}: requested {}, driver stored {}",
                id,
                value,
                stored
            );
        }
    }

    let controls: Vec<ControlInfo> = dev
        .enumerate_controls()
        .collect::<d4xx::Result<Vec<_>>>()?
        .into_iter()
        .filter(|c| args.all || !(c.is_read_only() || c.is_inactive()))
        .map(|c| control_info(&dev, c))
        .collect();

    if json {
        let json_str = serde_json::to_string_pretty(&controls)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        println!("{} ({})", camera, role);
        for c in &controls {
            let value = c
                .value
                .map_or_else(|| "-".to_string(), |v| v.to_string());
            println!(
                "  0x{:08x} {:<32} {:<8} min={} max={} step={} default={} value={}",
                c.id, c.name, c.ctrl_type, c.minimum, c.maximum, c.step, c.default, value
            );
        }
    }

    Ok(())
}

fn control_info(dev: &DeviceHandle, desc: ControlDescriptor) -> ControlInfo {
    let readable = !desc.ctrl_type.is_compound()
        && !matches!(
            desc.ctrl_type,
            ControlType::Button
                | ControlType::CtrlClass
                | ControlType::Integer64
                | ControlType::String
        )
        && desc.flags & V4L2_CTRL_FLAG_WRITE_ONLY == 0;
    let value = if readable {
        dev.get_control(desc.id)
            .map_err(|e| log::debug!("{}: {}", desc.name, e))
            .ok()
    } else {
        None
    };

    ControlInfo {
        id: desc.id,
        ctrl_type: desc.ctrl_type.to_string(),
        minimum: desc.minimum,
        maximum: desc.maximum,
        step: desc.step,
        default: desc.default_value,
        value,
        read_only: desc.is_read_only(),
        inactive: desc.is_inactive(),
        name: desc.name,
    }
}

/// Parse "ID=VALUE" where ID may be hex (0x...) or decimal
fn parse_assignment(s: &str) -> Result<(u32, i32), CliError> {
    let (id_str, value_str) = s
        .split_once('=')
        .ok_or_else(|| CliError::InvalidArgs(format!("Expected ID=VALUE: {}", s)))?;

    let id_str = id_str.trim();
    let id = match id_str
        .strip_prefix("0x")
        .or_else(|| id_str.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => id_str.parse::<u32>(),
    }
    .map_err(|_| CliError::InvalidArgs(format!("Invalid control id: {}", id_str)))?;

    let value = value_str
        .trim()
        .parse::<i32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid control value: {}", value_str)))?;

    Ok((id, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use d4xx::controls::DS5_CAMERA_CID_LASER_POWER;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("0x009a4001=1").unwrap(),
            (DS5_CAMERA_CID_LASER_POWER, 1)
        );
        assert_eq!(
            parse_assignment("10094850 = -3").unwrap(),
            (10094850, -3)
        );
        assert!(parse_assignment("0x009a4001").is_err());
        assert!(parse_assignment("laser=1").is_err());
        assert!(parse_assignment("0x1=on").is_err());
    }
}
