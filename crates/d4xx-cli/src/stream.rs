// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Stream a node and check frame rate and sequence continuity.

use crate::error::CliError;
use crate::utils::{open_role, parse_fourcc, parse_resolution, parse_role, select_camera};
use clap::Args as ClapArgs;
use d4xx::device::Format;
use d4xx::discovery::Role;
use d4xx::fourcc::FourCC;
use d4xx::stream::{measured_fps, FrameDescriptor, SequenceReport, StreamSession};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera position in discovery order
    #[arg(short, long, default_value_t = 0)]
    camera: usize,

    /// Node role to stream (depth, depth-md, color, color-md, ir)
    #[arg(short, long, default_value = "depth")]
    role: String,

    /// Resolution (e.g., 848x480, 1280x720)
    #[arg(long, default_value = "848x480")]
    resolution: String,

    /// Pixel format (FOURCC), defaults to Z16 for depth and YUYV for color
    #[arg(short, long)]
    format: Option<String>,

    /// Requested frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Number of frames to capture
    #[arg(short = 'n', long, default_value_t = 100)]
    frames: usize,

    /// Dequeue timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout: u64,

    /// Number of streaming buffers to request
    #[arg(long, default_value_t = 4)]
    buffers: u32,

    /// Allowed deviation of the measured frame rate, in percent
    #[arg(long, default_value_t = 10.0)]
    tolerance: f64,
}

#[derive(Debug, Serialize)]
struct StreamOutput {
    device: String,
    format: String,
    requested_fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver_fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    measured_fps: Option<f64>,
    frames: usize,
    monotonic: bool,
    max_gap: u32,
    dropped: u64,
    short_frames: usize,
    elapsed_ms: u128,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing stream command: {:?}", args);

    if args.frames < 2 {
        return Err(CliError::InvalidArgs(
            "at least 2 frames are needed to measure a frame rate".to_string(),
        ));
    }

    let role = parse_role(&args.role)?;
    let request = requested_format(&args, role)?;

    let camera = select_camera(args.camera)?;
    let dev = open_role(&camera, role)?;

    let accepted = dev.set_format(&request)?;
    if !accepted.matches_request(&request) {
        log::warn!("requested {}, driver selected {}", request, accepted);
    }
    let params = dev.set_streaming_parameters(request.buffer_type(), args.fps)?;
    if params.is_none() {
        log::info!("{}: frame rate not configurable, using driver default", dev.path().display());
    }

    let expected_size = match &accepted {
        Format::Video(pix) => pix.size_image,
        Format::Meta(_) => 0,
    };

    log::info!("Streaming {} frames from {} ({})", args.frames, dev.path().display(), accepted);

    let timeout = Duration::from_millis(args.timeout);
    let start = Instant::now();
    let mut session = StreamSession::acquire(&dev, request.buffer_type(), args.buffers)?;
    let mut descriptors: Vec<FrameDescriptor> = Vec::with_capacity(args.frames);
    while descriptors.len() < args.frames {
        let descriptor = session.dequeue(timeout)?.descriptor;
        session.requeue(&descriptor)?;
        descriptors.push(descriptor);

        if descriptors.len() % 30 == 0 {
            log::debug!("Captured {} frames", descriptors.len());
        }
    }
    session.release();
    let elapsed = start.elapsed();

    let report = SequenceReport::from_descriptors(&descriptors);
    let fps = measured_fps(&descriptors);
    let short_frames = descriptors
        .iter()
        .filter(|d| d.bytes_used < expected_size)
        .count();

    let output = StreamOutput {
        device: dev.path().display().to_string(),
        format: accepted.to_string(),
        requested_fps: args.fps,
        driver_fps: params.and_then(|p| p.fps()),
        measured_fps: fps,
        frames: report.frames,
        monotonic: report.monotonic,
        max_gap: report.max_gap,
        dropped: report.dropped,
        short_frames,
        elapsed_ms: elapsed.as_millis(),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_output(&output);
    }

    check(&output, args.tolerance)
}

fn requested_format(args: &Args, role: Role) -> Result<Format, CliError> {
    match role {
        Role::DepthMetadata | Role::ColorMetadata => {
            let fourcc = match &args.format {
                Some(f) => parse_fourcc(f)?,
                None => FourCC::D4XX,
            };
            Ok(Format::meta(fourcc))
        }
        Role::Inertial => Err(CliError::InvalidArgs(
            "the imu node is not a frame stream".to_string(),
        )),
        _ => {
            let res = parse_resolution(&args.resolution)?;
            let fourcc = match &args.format {
                Some(f) => parse_fourcc(f)?,
                None if role == Role::Depth => FourCC::Z16,
                None if role == Role::Infrared => FourCC::Y8I,
                None => FourCC::YUYV,
            };
            Ok(Format::video(res.width, res.height, fourcc))
        }
    }
}

fn check(output: &StreamOutput, tolerance: f64) -> Result<(), CliError> {
    if !output.monotonic {
        return Err(CliError::CheckFailed(
            "frame sequence numbers went backwards".to_string(),
        ));
    }
    let measured = output.measured_fps.ok_or_else(|| {
        CliError::CheckFailed("frame timestamps did not advance".to_string())
    })?;
    let target = output.driver_fps.unwrap_or(output.requested_fps as f64);
    if !within_tolerance(measured, target, tolerance) {
        return Err(CliError::CheckFailed(format!(
            "measured {:.2} fps, expected {:.2} +/- {}%",
            measured, target, tolerance
        )));
    }
    Ok(())
}

fn within_tolerance(measured: f64, target: f64, tolerance_pct: f64) -> bool {
    (measured - target).abs() <= target * tolerance_pct / 100.0
}

fn print_text_output(output: &StreamOutput) {
    println!("Device:       {}", output.device);
    println!("Format:       {}", output.format);
    match output.driver_fps {
        Some(fps) => println!("Frame rate:   {} requested, {:.2} configured", output.requested_fps, fps),
        None => println!("Frame rate:   {} requested", output.requested_fps),
    }
    match output.measured_fps {
        Some(fps) => println!("Measured:     {:.2} fps", fps),
        None => println!("Measured:     n/a"),
    }
    println!("Frames:       {} in {} ms", output.frames, output.elapsed_ms);
    println!(
        "Sequence:     {} (max gap {}, {} dropped)",
        if output.monotonic { "monotonic" } else { "NOT monotonic" },
        output.max_gap,
        output.dropped
    );
    if output.short_frames > 0 {
        println!("Short frames: {}", output.short_frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(monotonic: bool, measured: Option<f64>) -> StreamOutput {
        StreamOutput {
            device: "/dev/video0".into(),
            format: "Z16  848x480".into(),
            requested_fps: 30,
            driver_fps: None,
            measured_fps: measured,
            frames: 100,
            monotonic,
            max_gap: 1,
            dropped: 0,
            short_frames: 0,
            elapsed_ms: 3300,
        }
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(29.5, 30.0, 10.0));
        assert!(within_tolerance(33.0, 30.0, 10.0));
        assert!(!within_tolerance(26.0, 30.0, 10.0));
    }

    #[test]
    fn test_check() {
        assert!(check(&output(true, Some(29.97)), 10.0).is_ok());
        assert!(matches!(
            check(&output(false, Some(30.0)), 10.0),
            Err(CliError::CheckFailed(_))
        ));
        assert!(matches!(
            check(&output(true, None), 10.0),
            Err(CliError::CheckFailed(_))
        ));
        assert!(matches!(
            check(&output(true, Some(15.0)), 10.0),
            Err(CliError::CheckFailed(_))
        ));
    }

    #[test]
    fn test_driver_fps_takes_precedence() {
        let mut out = output(true, Some(15.0));
        out.driver_fps = Some(15.0);
        assert!(check(&out, 10.0).is_ok());
    }
}
