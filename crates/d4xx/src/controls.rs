// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Control identifiers and typed control descriptors.

use std::fmt;

use crate::records::{c_string, V4l2Queryctrl, V4L2_CTRL_CLASS_CAMERA};

// ===== Standard camera class =====

pub const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Exposure mode menu (see the `V4L2_EXPOSURE_*` values)
pub const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;
/// Absolute exposure time in 100 µs units
pub const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;

pub const V4L2_EXPOSURE_MANUAL: i32 = 1;
pub const V4L2_EXPOSURE_APERTURE_PRIORITY: i32 = 3;

// ===== D4XX vendor controls =====

pub const DS5_CAMERA_CID_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x4000;

pub const DS5_CAMERA_CID_LOG: u32 = DS5_CAMERA_CID_BASE;
/// Emitter on/off
pub const DS5_CAMERA_CID_LASER_POWER: u32 = DS5_CAMERA_CID_BASE + 1;
/// Emitter power level
pub const DS5_CAMERA_CID_MANUAL_LASER_POWER: u32 = DS5_CAMERA_CID_BASE + 2;
pub const DS5_CAMERA_DEPTH_CALIBRATION_TABLE_GET: u32 = DS5_CAMERA_CID_BASE + 3;
pub const DS5_CAMERA_DEPTH_CALIBRATION_TABLE_SET: u32 = DS5_CAMERA_CID_BASE + 4;
pub const DS5_CAMERA_COEFF_CALIBRATION_TABLE_GET: u32 = DS5_CAMERA_CID_BASE + 5;
pub const DS5_CAMERA_COEFF_CALIBRATION_TABLE_SET: u32 = DS5_CAMERA_CID_BASE + 6;
/// Packed `major.minor.patch.build`, see [`FirmwareVersion`]
pub const DS5_CAMERA_CID_FW_VERSION: u32 = DS5_CAMERA_CID_BASE + 7;
/// General version data blob
pub const DS5_CAMERA_CID_GVD: u32 = DS5_CAMERA_CID_BASE + 8;
pub const DS5_CAMERA_CID_AE_ROI_GET: u32 = DS5_CAMERA_CID_BASE + 9;
pub const DS5_CAMERA_CID_AE_ROI_SET: u32 = DS5_CAMERA_CID_BASE + 10;
pub const DS5_CAMERA_CID_AE_SETPOINT_GET: u32 = DS5_CAMERA_CID_BASE + 11;
pub const DS5_CAMERA_CID_AE_SETPOINT_SET: u32 = DS5_CAMERA_CID_BASE + 12;
/// EEPROM read block
pub const DS5_CAMERA_CID_ERB: u32 = DS5_CAMERA_CID_BASE + 13;
/// EEPROM write block
pub const DS5_CAMERA_CID_EWB: u32 = DS5_CAMERA_CID_BASE + 14;
/// Raw hardware monitor command
pub const DS5_CAMERA_CID_HWMC: u32 = DS5_CAMERA_CID_BASE + 15;
pub const DS5_CAMERA_CID_PWM: u32 = DS5_CAMERA_CID_BASE + 22;
pub const DS5_CAMERA_CID_HWMC_RW: u32 = DS5_CAMERA_CID_BASE + 32;

/// Writing 1 triggers a camera reset. The device disappears and re-enumerates.
pub const DS5_CAMERA_CID_HW_RESET: u32 = 0x009a_2064;

// ===== Control flags =====

pub const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;
pub const V4L2_CTRL_FLAG_READ_ONLY: u32 = 0x0004;
pub const V4L2_CTRL_FLAG_INACTIVE: u32 = 0x0010;
pub const V4L2_CTRL_FLAG_WRITE_ONLY: u32 = 0x0040;
/// OR'ed into a query id to ask for the next control after it.
pub const V4L2_CTRL_FLAG_NEXT_CTRL: u32 = 0x8000_0000;

/// V4L2 control value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Button,
    Integer64,
    CtrlClass,
    String,
    Bitmask,
    IntegerMenu,
    U8,
    U16,
    U32,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            1 => ControlType::Integer,
            2 => ControlType::Boolean,
            3 => ControlType::Menu,
            4 => ControlType::Button,
            5 => ControlType::Integer64,
            6 => ControlType::CtrlClass,
            7 => ControlType::String,
            8 => ControlType::Bitmask,
            9 => ControlType::IntegerMenu,
            0x0100 => ControlType::U8,
            0x0101 => ControlType::U16,
            0x0102 => ControlType::U32,
            other => ControlType::Unknown(other),
        }
    }
}

impl ControlType {
    /// Compound (array) controls are read and written through the
    /// extended-control requests.
    pub fn is_compound(&self) -> bool {
        matches!(self, ControlType::U8 | ControlType::U16 | ControlType::U32)
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlType::Integer => f.write_str("int"),
            ControlType::Boolean => f.write_str("bool"),
            ControlType::Menu => f.write_str("menu"),
            ControlType::Button => f.write_str("button"),
            ControlType::Integer64 => f.write_str("int64"),
            ControlType::CtrlClass => f.write_str("class"),
            ControlType::String => f.write_str("str"),
            ControlType::Bitmask => f.write_str("bitmask"),
            ControlType::IntegerMenu => f.write_str("intmenu"),
            ControlType::U8 => f.write_str("u8"),
            ControlType::U16 => f.write_str("u16"),
            ControlType::U32 => f.write_str("u32"),
            ControlType::Unknown(t) => write!(f, "type-{}", t),
        }
    }
}

/// Snapshot of a `VIDIOC_QUERYCTRL` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDescriptor {
    pub id: u32,
    pub ctrl_type: ControlType,
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

impl ControlDescriptor {
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_READ_ONLY != 0
    }

    pub fn is_inactive(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_INACTIVE != 0
    }
}

impl From<&V4l2Queryctrl> for ControlDescriptor {
    fn from(q: &V4l2Queryctrl) -> Self {
        ControlDescriptor {
            id: q.id,
            ctrl_type: ControlType::from(q.type_),
            name: c_string(&q.name),
            minimum: q.minimum,
            maximum: q.maximum,
            step: q.step,
            default_value: q.default_value,
            flags: q.flags,
        }
    }
}

/// Camera firmware version as reported by [`DS5_CAMERA_CID_FW_VERSION`].
///
/// The control value packs one component per byte, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: u8,
}

impl FirmwareVersion {
    pub fn from_raw(raw: i32) -> Self {
        let [major, minor, patch, build] = (raw as u32).to_be_bytes();
        FirmwareVersion {
            major,
            minor,
            patch,
            build,
        }
    }

    /// The raw control value as 4 big-endian bytes.
    pub fn raw_bytes(&self) -> [u8; 4] {
        [self.major, self.minor, self.patch, self.build]
    }

    pub fn raw(&self) -> i32 {
        i32::from_be_bytes(self.raw_bytes())
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fill_c_string;
    use bytemuck::Zeroable;

    #[test]
    fn test_standard_control_ids() {
        assert_eq!(V4L2_CID_CAMERA_CLASS_BASE, 0x009a_0900);
        assert_eq!(V4L2_CID_EXPOSURE_AUTO, 0x009a_0901);
        assert_eq!(V4L2_CID_EXPOSURE_ABSOLUTE, 0x009a_0902);
    }

    #[test]
    fn test_vendor_control_ids() {
        assert_eq!(DS5_CAMERA_CID_BASE, 0x009a_4000);
        assert_eq!(DS5_CAMERA_CID_LASER_POWER, 0x009a_4001);
        assert_eq!(DS5_CAMERA_CID_MANUAL_LASER_POWER, 0x009a_4002);
        assert_eq!(DS5_CAMERA_CID_FW_VERSION, 0x009a_4007);
        assert_eq!(DS5_CAMERA_CID_GVD, 0x009a_4008);
        assert_eq!(DS5_CAMERA_CID_AE_ROI_GET, 0x009a_4009);
        assert_eq!(DS5_CAMERA_CID_AE_SETPOINT_SET, 0x009a_400c);
        assert_eq!(DS5_CAMERA_CID_HWMC, 0x009a_400f);
        assert_eq!(DS5_CAMERA_CID_PWM, 0x009a_4016);
        assert_eq!(DS5_CAMERA_CID_HWMC_RW, 0x009a_4020);
    }

    #[test]
    fn test_control_type_from_u32() {
        assert_eq!(ControlType::from(1), ControlType::Integer);
        assert_eq!(ControlType::from(3), ControlType::Menu);
        assert_eq!(ControlType::from(0x100), ControlType::U8);
        assert_eq!(ControlType::from(0x102), ControlType::U32);
        assert_eq!(ControlType::from(0x55), ControlType::Unknown(0x55));
        assert!(ControlType::U16.is_compound());
        assert!(!ControlType::Integer64.is_compound());
    }

    #[test]
    fn test_descriptor_from_record() {
        let mut q = V4l2Queryctrl::zeroed();
        q.id = DS5_CAMERA_CID_MANUAL_LASER_POWER;
        q.type_ = 1;
        fill_c_string(&mut q.name, "Manual Laser Power");
        q.minimum = 0;
        q.maximum = 360;
        q.step = 30;
        q.default_value = 150;
        q.flags = V4L2_CTRL_FLAG_DISABLED;

        let desc = ControlDescriptor::from(&q);
        assert_eq!(desc.name, "Manual Laser Power");
        assert_eq!(desc.ctrl_type, ControlType::Integer);
        assert_eq!(desc.maximum, 360);
        assert!(desc.is_disabled());
        assert!(!desc.is_read_only());
    }

    #[test]
    fn test_firmware_version_unpack() {
        let fw = FirmwareVersion::from_raw(0x050f_0a64);
        assert_eq!(fw.to_string(), "5.15.10.100");
        assert_eq!(fw.raw_bytes(), [5, 15, 10, 100]);
        assert_eq!(fw.raw(), 0x050f_0a64);
    }

    #[test]
    fn test_firmware_version_high_bit() {
        let fw = FirmwareVersion::from_raw(0xff01_0203_u32 as i32);
        assert_eq!(fw.major, 255);
        assert_eq!(fw.to_string(), "255.1.2.3");
    }

    #[test]
    fn test_firmware_version_ordering() {
        let old = FirmwareVersion::from_raw(0x050e_0000);
        let new = FirmwareVersion::from_raw(0x050f_0000);
        assert!(old < new);
    }
}
