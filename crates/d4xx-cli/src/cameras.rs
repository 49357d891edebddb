// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Camera discovery listing with per-role nodes and formats.

use crate::error::CliError;
use clap::Args as ClapArgs;
use d4xx::device::DeviceHandle;
use d4xx::discovery::{Camera, Discovery, Role};
use d4xx::records::BufferType;
use serde::Serialize;
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Device directory to scan
    #[arg(long, default_value = "/dev")]
    root: PathBuf,

    /// Show formats and frame sizes of each node
    #[arg(short, long)]
    formats: bool,
}

#[derive(Debug, Serialize)]
struct CamerasOutput {
    cameras: Vec<CameraInfo>,
}

#[derive(Debug, Serialize)]
struct CameraInfo {
    base_index: u32,
    driver: String,
    card: String,
    bus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fw_version: Option<String>,
    nodes: Vec<NodeInfo>,
}

#[derive(Debug, Serialize)]
struct NodeInfo {
    role: String,
    path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Serialize)]
struct FormatInfo {
    fourcc: String,
    description: String,
    sizes: Vec<String>,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing cameras command: {:?}", args);

    let mut discovery = Discovery::with_root(&args.root);
    let cameras: Vec<CameraInfo> = discovery
        .cameras()
        .iter()
        .map(|camera| camera_info(camera, args.formats))
        .collect();

    let output = CamerasOutput { cameras };

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_output(&output);
    }

    if output.cameras.is_empty() {
        return Err(CliError::CameraNotFound(format!(
            "no D4XX camera under {}",
            args.root.display()
        )));
    }

    Ok(())
}

fn camera_info(camera: &Camera, formats: bool) -> CameraInfo {
    let nodes = camera
        .roles()
        .map(|role| NodeInfo {
            role: role.to_string(),
            path: camera.path(role).display().to_string(),
            formats: if formats {
                collect_formats(camera, role)
            } else {
                Vec::new()
            },
        })
        .collect();

    CameraInfo {
        base_index: camera.base_index,
        driver: camera.driver.clone(),
        card: camera.card.clone(),
        bus: camera.bus_info.clone(),
        fw_version: camera.fw_version.map(|fw| fw.to_string()),
        nodes,
    }
}

fn collect_formats(camera: &Camera, role: Role) -> Vec<FormatInfo> {
    let dev = match DeviceHandle::open(camera.path(role)) {
        Ok(dev) => dev,
        Err(e) => {
            log::warn!("{}", e);
            return Vec::new();
        }
    };

    let buf_type = match role {
        Role::DepthMetadata | Role::ColorMetadata => BufferType::MetaCapture,
        _ => BufferType::VideoCapture,
    };

    match list_formats(&dev, buf_type) {
        Ok(formats) => formats,
        Err(e) => {
            log::warn!("{}: {}", camera.path(role).display(), e);
            Vec::new()
        }
    }
}

fn list_formats(dev: &DeviceHandle, buf_type: BufferType) -> d4xx::Result<Vec<FormatInfo>> {
    dev.enumerate_formats(buf_type)
        .map(|desc| {
            let desc = desc?;
            let sizes = dev
                .enumerate_frame_sizes(desc.fourcc)
                .map(|size| size.map(|size| size.to_string()))
                .collect::<d4xx::Result<Vec<_>>>()?;
            Ok(FormatInfo {
                fourcc: desc.fourcc.to_string(),
                description: desc.description,
                sizes,
            })
        })
        .collect()
}

fn print_text_output(output: &CamerasOutput) {
    if output.cameras.is_empty() {
        println!("No D4XX cameras found");
        return;
    }

    for camera in &output.cameras {
        println!("Camera {} - {} ({})", camera.base_index, camera.card, camera.driver);
        println!("  Bus:      {}", camera.bus);
        if let Some(fw) = &camera.fw_version {
            println!("  Firmware: {}", fw);
        }
        for node in &camera.nodes {
            println!("  {:<9} {}", node.role, node.path);
            for fmt in &node.formats {
                println!("      {} ({})", fmt.fourcc, fmt.description);
                for size in &fmt.sizes {
                    println!("        {}", size);
                }
            }
        }
    }
}
