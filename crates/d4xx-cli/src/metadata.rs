// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Depth metadata capture with layout decode and CRC check.

use crate::error::CliError;
use crate::utils::{open_role, parse_resolution, percent, select_camera};
use clap::Args as ClapArgs;
use d4xx::device::Format;
use d4xx::discovery::Role;
use d4xx::fourcc::FourCC;
use d4xx::metadata::{self, MetadataRecord};
use d4xx::records::BufferType;
use d4xx::stream::{SequenceReport, StreamSession};
use serde::Serialize;
use std::time::Duration;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Camera position in discovery order
    #[arg(short, long, default_value_t = 0)]
    camera: usize,

    /// Depth resolution (e.g., 848x480)
    #[arg(long, default_value = "848x480")]
    resolution: String,

    /// Requested frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Number of metadata buffers to capture
    #[arg(short = 'n', long, default_value_t = 100)]
    frames: usize,

    /// Dequeue timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout: u64,

    /// Number of streaming buffers per node
    #[arg(long, default_value_t = 4)]
    buffers: u32,

    /// Minimum share of records with a valid CRC, in percent
    #[arg(long, default_value_t = 90.0)]
    min_pass: f64,

    /// Print every decoded record
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Serialize)]
struct MetadataOutput {
    device: String,
    buffers: usize,
    decoded: usize,
    undecodable: usize,
    crc_valid: usize,
    crc_pass_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<&'static str>,
    counter_monotonic: bool,
    counter_max_gap: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    records: Vec<RecordInfo>,
}

#[derive(Debug, Serialize)]
struct RecordInfo {
    sequence: u32,
    layout: &'static str,
    frame_counter: u32,
    hw_timestamp: u32,
    crc: String,
    crc_valid: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing metadata command: {:?}", args);

    let res = parse_resolution(&args.resolution)?;
    let camera = select_camera(args.camera)?;
    let md_dev = open_role(&camera, Role::DepthMetadata)?;
    let depth_dev = open_role(&camera, Role::Depth)?;

    md_dev.set_format(&Format::meta(FourCC::D4XX))?;
    depth_dev.set_format(&Format::video(res.width, res.height, FourCC::Z16))?;
    depth_dev.set_streaming_parameters(BufferType::VideoCapture, args.fps)?;

    let timeout = Duration::from_millis(args.timeout);

    // metadata is only produced while depth streams; start it first
    let mut md_session = StreamSession::acquire(&md_dev, BufferType::MetaCapture, args.buffers)?;
    let mut depth_session =
        StreamSession::acquire(&depth_dev, BufferType::VideoCapture, args.buffers)?;

    let mut decoded: Vec<(u32, MetadataRecord, bool)> = Vec::with_capacity(args.frames);
    let mut undecodable = 0;
    for _ in 0..args.frames {
        let depth = depth_session.dequeue(timeout)?.descriptor;
        depth_session.requeue(&depth)?;

        let (descriptor, result) = {
            let frame = md_session.dequeue(timeout)?;
            let result = metadata::decode(frame.data).map(|record| {
                let valid = metadata::validate_checksum(frame.data, &record);
                (record, valid)
            });
            (frame.descriptor, result)
        };
        md_session.requeue(&descriptor)?;

        match result {
            Some((record, valid)) => decoded.push((descriptor.sequence, record, valid)),
            None => {
                log::debug!(
                    "buffer {}: {} bytes, too short for any metadata layout",
                    descriptor.sequence,
                    descriptor.bytes_used
                );
                undecodable += 1;
            }
        }
    }
    depth_session.release();
    md_session.release();

    let crc_valid = decoded.iter().filter(|(_, _, valid)| *valid).count();
    let counters = SequenceReport::from_sequences(decoded.iter().map(|(_, r, _)| r.frame_counter()));

    let records = if args.dump {
        decoded
            .iter()
            .map(|(sequence, record, valid)| RecordInfo {
                sequence: *sequence,
                layout: record.layout_name(),
                frame_counter: record.frame_counter(),
                hw_timestamp: record.hw_timestamp(),
                crc: format!("0x{:08x}", record.checksum()),
                crc_valid: *valid,
            })
            .collect()
    } else {
        Vec::new()
    };

    let output = MetadataOutput {
        device: md_dev.path().display().to_string(),
        buffers: args.frames,
        decoded: decoded.len(),
        undecodable,
        crc_valid,
        crc_pass_pct: percent(crc_valid, decoded.len()),
        layout: decoded.first().map(|(_, r, _)| r.layout_name()),
        counter_monotonic: counters.monotonic,
        counter_max_gap: counters.max_gap,
        records,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_output(&output);
    }

    check(&output, args.min_pass)
}

fn check(output: &MetadataOutput, min_pass: f64) -> Result<(), CliError> {
    if output.decoded == 0 {
        return Err(CliError::CheckFailed(
            "no metadata buffer could be decoded".to_string(),
        ));
    }
    if output.crc_pass_pct < min_pass {
        return Err(CliError::CheckFailed(format!(
            "CRC valid on {:.1}% of records, need {:.1}%",
            output.crc_pass_pct, min_pass
        )));
    }
    if !output.counter_monotonic {
        return Err(CliError::CheckFailed(
            "metadata frame counter went backwards".to_string(),
        ));
    }
    Ok(())
}

fn print_text_output(output: &MetadataOutput) {
    for r in &output.records {
        println!(
            "  seq {:>6} {:<16} counter {:>8} hw_ts {:>10} crc {} {}",
            r.sequence,
            r.layout,
            r.frame_counter,
            r.hw_timestamp,
            r.crc,
            if r.crc_valid { "ok" } else { "BAD" }
        );
    }
    println!("Device:      {}", output.device);
    if let Some(layout) = output.layout {
        println!("Layout:      {}", layout);
    }
    println!(
        "Decoded:     {} of {} ({} undecodable)",
        output.decoded, output.buffers, output.undecodable
    );
    println!(
        "CRC valid:   {} ({:.1}%)",
        output.crc_valid, output.crc_pass_pct
    );
    println!(
        "Counter:     {} (max gap {})",
        if output.counter_monotonic {
            "monotonic"
        } else {
            "NOT monotonic"
        },
        output.counter_max_gap
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(decoded: usize, crc_valid: usize, monotonic: bool) -> MetadataOutput {
        MetadataOutput {
            device: "/dev/video1".into(),
            buffers: decoded,
            decoded,
            undecodable: 0,
            crc_valid,
            crc_pass_pct: percent(crc_valid, decoded),
            layout: None,
            counter_monotonic: monotonic,
            counter_max_gap: 1,
            records: Vec::new(),
        }
    }

    #[test]
    fn test_check_pass_rate() {
        assert!(check(&output(100, 95, true), 90.0).is_ok());
        assert!(check(&output(100, 90, true), 90.0).is_ok());
        assert!(matches!(
            check(&output(100, 89, true), 90.0),
            Err(CliError::CheckFailed(_))
        ));
    }

    #[test]
    fn test_check_nothing_decoded() {
        assert!(matches!(
            check(&output(0, 0, true), 0.0),
            Err(CliError::CheckFailed(_))
        ));
    }

    #[test]
    fn test_check_counter_regression() {
        assert!(matches!(
            check(&output(10, 10, false), 90.0),
            Err(CliError::CheckFailed(_))
        ));
    }
}
