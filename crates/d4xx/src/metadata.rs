// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors
#![forbid(unsafe_code)]

//! D4XX per-frame metadata
//!
//! The metadata node delivers one fixed-layout, little-endian, packed record
//! per depth/IR frame. Two layouts exist:
//!
//! | Layout                 | Size | Content                                        |
//! |------------------------|------|------------------------------------------------|
//! | [`ExtendedDepthIr`]    | 68   | flat MIPI depth/IR record                      |
//! | [`LegacyDepth`]        | 224  | timing, stats, depth control, configuration    |
//!
//! Both end in a CRC-32 (zlib polynomial) over every byte before it.
//!
//! [`decode`] picks the layout purely from the block length: the extended
//! layout whenever the block holds at least 68 bytes, otherwise the legacy
//! layout when it holds at least 224 bytes. Since the extended record is the
//! shorter of the two, `decode` never selects the legacy layout; use
//! [`LegacyDepth::parse`] for streams known to carry it. A checksum mismatch
//! is a `false` from [`validate_checksum`], never an error.

use std::fmt;

pub const EXTENDED_DEPTH_IR_SIZE: usize = 68;
pub const LEGACY_DEPTH_SIZE: usize = 224;

/// Size of the trailing checksum field.
pub const CRC_SIZE: usize = 4;

/// CRC-32 as used by the metadata records.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Little-endian cursor over a block whose length was checked up front.
struct LeReader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> LeReader<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        LeReader { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }
}

/// Extended MIPI depth/IR metadata record (68 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedDepthIr {
    pub res: [u32; 3],
    pub frame_counter: u32,
    pub meta_data_id: u32,
    pub size: u32,
    pub version: u8,
    pub calib_info: u16,
    pub reserved: u8,
    pub flags: u32,
    pub hw_timestamp: u32,
    pub optical_timestamp: u32,
    pub exposure_time: u32,
    pub manual_exposure: u32,
    pub laser_power: u16,
    pub trigger: u16,
    pub projector_mode: u8,
    pub preset: u8,
    pub manual_gain: u8,
    pub auto_exposure_mode: u8,
    pub input_width: u16,
    pub input_height: u16,
    pub subpreset_info: u32,
    pub crc32: u32,
}

impl ExtendedDepthIr {
    /// Reads the record from the start of `raw`; `None` when too short.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < EXTENDED_DEPTH_IR_SIZE {
            return None;
        }
        let mut r = LeReader::new(&raw[..EXTENDED_DEPTH_IR_SIZE]);
        let record = ExtendedDepthIr {
            res: [r.u32(), r.u32(), r.u32()],
            frame_counter: r.u32(),
            meta_data_id: r.u32(),
            size: r.u32(),
            version: r.u8(),
            calib_info: r.u16(),
            reserved: r.u8(),
            flags: r.u32(),
            hw_timestamp: r.u32(),
            optical_timestamp: r.u32(),
            exposure_time: r.u32(),
            manual_exposure: r.u32(),
            laser_power: r.u16(),
            trigger: r.u16(),
            projector_mode: r.u8(),
            preset: r.u8(),
            manual_gain: r.u8(),
            auto_exposure_mode: r.u8(),
            input_width: r.u16(),
            input_height: r.u16(),
            subpreset_info: r.u32(),
            crc32: r.u32(),
        };
        debug_assert_eq!(r.pos, EXTENDED_DEPTH_IR_SIZE);
        Some(record)
    }
}

/// `{id, size}` header opening every legacy sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataHeader {
    pub id: u32,
    pub size: u32,
}

impl MetadataHeader {
    fn read(r: &mut LeReader<'_>) -> Self {
        MetadataHeader {
            id: r.u32(),
            size: r.u32(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTiming {
    pub header: MetadataHeader,
    pub version: u32,
    pub flag: u32,
    pub frame_counter: u32,
    pub optical_timestamp: u32,
    pub readout_time: u32,
    pub exposure_time: u32,
    pub frame_interval: u32,
    pub pipe_latency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub header: MetadataHeader,
    pub flags: u32,
    pub hw_timestamp: u32,
    pub exposure_time: u64,
    pub exposure_compensation_flags: u64,
    pub exposure_compensation_value: i32,
    pub iso_speed: u32,
    pub focus_state: u32,
    pub lens_position: u32,
    pub white_balance: u32,
    pub flash: u32,
    pub flash_power: u32,
    pub zoom_factor: u32,
    pub scene_mode: u64,
    pub sensor_framerate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthControl {
    pub header: MetadataHeader,
    pub version: u32,
    pub flag: u32,
    pub manual_gain: u32,
    pub manual_exposure: u32,
    pub laser_power: u32,
    pub auto_exposure_mode: u32,
    pub exposure_priority: u32,
    pub exposure_roi_left: u32,
    pub exposure_roi_right: u32,
    pub exposure_roi_top: u32,
    pub exposure_roi_bottom: u32,
    pub preset: u32,
    pub projector_mode: u8,
    pub reserved: u8,
    pub led_power: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub header: MetadataHeader,
    pub version: u32,
    pub flag: u32,
    pub hw_type: u8,
    pub sku_id: u8,
    pub cookie: u32,
    pub format: u16,
    pub width: u16,
    pub height: u16,
    pub fps: u16,
    pub trigger: u16,
    pub calibration_count: u16,
    pub reserved: [u8; 6],
}

/// Legacy depth ("Y normal mode") metadata record (224 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyDepth {
    pub capture_timing: CaptureTiming,
    pub capture_stats: CaptureStats,
    pub depth_control: DepthControl,
    pub configuration: Configuration,
    pub crc32: u32,
}

impl LegacyDepth {
    /// Reads the record from the start of `raw`; `None` when too short.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < LEGACY_DEPTH_SIZE {
            return None;
        }
        let mut r = LeReader::new(&raw[..LEGACY_DEPTH_SIZE]);

        let capture_timing = CaptureTiming {
            header: MetadataHeader::read(&mut r),
            version: r.u32(),
            flag: r.u32(),
            frame_counter: r.u32(),
            optical_timestamp: r.u32(),
            readout_time: r.u32(),
            exposure_time: r.u32(),
            frame_interval: r.u32(),
            pipe_latency: r.u32(),
        };
        let capture_stats = CaptureStats {
            header: MetadataHeader::read(&mut r),
            flags: r.u32(),
            hw_timestamp: r.u32(),
            exposure_time: r.u64(),
            exposure_compensation_flags: r.u64(),
            exposure_compensation_value: r.i32(),
            iso_speed: r.u32(),
            focus_state: r.u32(),
            lens_position: r.u32(),
            white_balance: r.u32(),
            flash: r.u32(),
            flash_power: r.u32(),
            zoom_factor: r.u32(),
            scene_mode: r.u64(),
            sensor_framerate: r.u64(),
        };
        let depth_control = DepthControl {
            header: MetadataHeader::read(&mut r),
            version: r.u32(),
            flag: r.u32(),
            manual_gain: r.u32(),
            manual_exposure: r.u32(),
            laser_power: r.u32(),
            auto_exposure_mode: r.u32(),
            exposure_priority: r.u32(),
            exposure_roi_left: r.u32(),
            exposure_roi_right: r.u32(),
            exposure_roi_top: r.u32(),
            exposure_roi_bottom: r.u32(),
            preset: r.u32(),
            projector_mode: r.u8(),
            reserved: r.u8(),
            led_power: r.u16(),
        };
        let configuration = Configuration {
            header: MetadataHeader::read(&mut r),
            version: r.u32(),
            flag: r.u32(),
            hw_type: r.u8(),
            sku_id: r.u8(),
            cookie: r.u32(),
            format: r.u16(),
            width: r.u16(),
            height: r.u16(),
            fps: r.u16(),
            trigger: r.u16(),
            calibration_count: r.u16(),
            reserved: r.take(),
        };
        let crc32 = r.u32();
        debug_assert_eq!(r.pos, LEGACY_DEPTH_SIZE);

        Some(LegacyDepth {
            capture_timing,
            capture_stats,
            depth_control,
            configuration,
            crc32,
        })
    }
}

/// A decoded metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataRecord {
    ExtendedDepthIr(ExtendedDepthIr),
    LegacyDepth(LegacyDepth),
}

impl MetadataRecord {
    pub fn frame_counter(&self) -> u32 {
        match self {
            MetadataRecord::ExtendedDepthIr(md) => md.frame_counter,
            MetadataRecord::LegacyDepth(md) => md.capture_timing.frame_counter,
        }
    }

    pub fn hw_timestamp(&self) -> u32 {
        match self {
            MetadataRecord::ExtendedDepthIr(md) => md.hw_timestamp,
            MetadataRecord::LegacyDepth(md) => md.capture_stats.hw_timestamp,
        }
    }

    /// Stored trailing checksum.
    pub fn checksum(&self) -> u32 {
        match self {
            MetadataRecord::ExtendedDepthIr(md) => md.crc32,
            MetadataRecord::LegacyDepth(md) => md.crc32,
        }
    }

    /// Byte length of the matched layout, checksum included.
    pub fn layout_size(&self) -> usize {
        match self {
            MetadataRecord::ExtendedDepthIr(_) => EXTENDED_DEPTH_IR_SIZE,
            MetadataRecord::LegacyDepth(_) => LEGACY_DEPTH_SIZE,
        }
    }

    pub fn layout_name(&self) -> &'static str {
        match self {
            MetadataRecord::ExtendedDepthIr(_) => "ExtendedDepthIR",
            MetadataRecord::LegacyDepth(_) => "LegacyDepth",
        }
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frame {} hw_ts {} crc 0x{:08x}",
            self.layout_name(),
            self.frame_counter(),
            self.hw_timestamp(),
            self.checksum()
        )
    }
}

/// Decodes a raw metadata block, `None` when it is too short for any layout.
///
/// Layouts are tried by length, extended first. Every block long enough for
/// the legacy layout also meets the extended threshold, so legacy blocks are
/// only decoded through [`LegacyDepth::parse`].
pub fn decode(raw: &[u8]) -> Option<MetadataRecord> {
    if raw.len() >= EXTENDED_DEPTH_IR_SIZE {
        return ExtendedDepthIr::parse(raw).map(MetadataRecord::ExtendedDepthIr);
    }
    if raw.len() >= LEGACY_DEPTH_SIZE {
        return LegacyDepth::parse(raw).map(MetadataRecord::LegacyDepth);
    }
    None
}

/// Checks the stored CRC against the bytes preceding it in `raw`.
pub fn validate_checksum(raw: &[u8], record: &MetadataRecord) -> bool {
    let size = record.layout_size();
    if raw.len() < size {
        return false;
    }
    checksum(&raw[..size - CRC_SIZE]) == record.checksum()
}
