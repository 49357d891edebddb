// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

use crate::error::CliError;
use d4xx::device::{DeviceHandle, Resolution};
use d4xx::discovery::{Camera, Discovery, Role};
use d4xx::fourcc::FourCC;

/// Parse resolution string in format "WxH" or "W*H"
pub fn parse_resolution(s: &str) -> Result<Resolution, CliError> {
    let (width_str, height_str) = s
        .split_once('x')
        .or_else(|| s.split_once('*'))
        .ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "Invalid resolution format (expected WxH or W*H): {}",
                s
            ))
        })?;

    let width = width_str
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid width in resolution: {}", s)))?;
    let height = height_str
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid height in resolution: {}", s)))?;

    if width == 0 || height == 0 {
        return Err(CliError::InvalidArgs(format!(
            "Resolution dimensions must be positive: {}",
            s
        )));
    }

    Ok(Resolution::new(width, height))
}

/// Parse a format code such as "Z16" or "YUYV"
pub fn parse_fourcc(s: &str) -> Result<FourCC, CliError> {
    s.parse::<FourCC>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid FOURCC: {}", s)))
}

/// Parse a role name as used in `video-rs-{role}-{index}` links
pub fn parse_role(s: &str) -> Result<Role, CliError> {
    Role::from_link_name(s).ok_or_else(|| {
        let names: Vec<&str> = Role::ALL.iter().map(|r| r.link_name()).collect();
        CliError::InvalidArgs(format!(
            "Unknown role '{}' (expected one of: {})",
            s,
            names.join(", ")
        ))
    })
}

/// Pick the camera with the given position in discovery order
pub fn select_camera(index: usize) -> Result<Camera, CliError> {
    let mut discovery = Discovery::new();
    let cameras = discovery.cameras();
    if cameras.is_empty() {
        return Err(CliError::CameraNotFound(
            "no D4XX camera discovered".to_string(),
        ));
    }
    cameras.get(index).cloned().ok_or_else(|| {
        CliError::CameraNotFound(format!(
            "camera {} requested but only {} discovered",
            index,
            cameras.len()
        ))
    })
}

/// Open the node serving `role` on `camera`
pub fn open_role(camera: &Camera, role: Role) -> Result<DeviceHandle, CliError> {
    if !camera.has_role(role) {
        return Err(CliError::CameraNotFound(format!(
            "camera {} has no {} node",
            camera.base_index, role
        )));
    }
    Ok(DeviceHandle::open(camera.path(role))?)
}

/// Ratio as a percentage, 0 when `total` is 0
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
