// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Kernel ABI records exchanged with the V4L2 driver.
//!
//! Every record here is `#[repr(C)]` and mirrors `linux/videodev2.h` field for
//! field. Total sizes are checked by `const` assertions at the bottom of this
//! file for both 64-bit and 32-bit targets, so a layout mistake is a build
//! failure.
//!
//! Kernel unions are handled two ways. The large `fmt` and `parm` unions are
//! kept as raw byte arrays (with the kernel's alignment) and read through
//! typed accessors on the outer record. The small unions (`m` in the buffer
//! descriptor, the extended control value, the frame size and interval
//! payloads) are Rust `union`s.

use std::mem::size_of;
use std::os::raw::{c_long, c_ulong, c_void};

use bytemuck::{Pod, Zeroable};

// Capability bits (`v4l2_capability::capabilities`)
pub const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
pub const V4L2_CAP_META_CAPTURE: u32 = 0x0080_0000;
pub const V4L2_CAP_STREAMING: u32 = 0x0400_0000;
pub const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_BUF_TYPE_META_CAPTURE: u32 = 13;

pub const V4L2_MEMORY_MMAP: u32 = 1;

pub const V4L2_FIELD_ANY: u32 = 0;
pub const V4L2_FIELD_NONE: u32 = 1;

pub const V4L2_FRMSIZE_TYPE_DISCRETE: u32 = 1;
pub const V4L2_FRMSIZE_TYPE_CONTINUOUS: u32 = 2;
pub const V4L2_FRMSIZE_TYPE_STEPWISE: u32 = 3;

pub const V4L2_FRMIVAL_TYPE_DISCRETE: u32 = 1;
pub const V4L2_FRMIVAL_TYPE_CONTINUOUS: u32 = 2;
pub const V4L2_FRMIVAL_TYPE_STEPWISE: u32 = 3;

/// `v4l2_streamparm` capability bit: the driver honours `timeperframe`.
pub const V4L2_CAP_TIMEPERFRAME: u32 = 0x1000;

/// Extended control class used for camera-class and vendor controls.
pub const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009A_0000;

/// Buffer type tag carried alongside format and buffer records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    VideoCapture,
    MetaCapture,
}

impl BufferType {
    pub const fn as_raw(self) -> u32 {
        match self {
            BufferType::VideoCapture => V4L2_BUF_TYPE_VIDEO_CAPTURE,
            BufferType::MetaCapture => V4L2_BUF_TYPE_META_CAPTURE,
        }
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            V4L2_BUF_TYPE_VIDEO_CAPTURE => Some(BufferType::VideoCapture),
            V4L2_BUF_TYPE_META_CAPTURE => Some(BufferType::MetaCapture),
            _ => None,
        }
    }
}

/// Converts a NUL-padded fixed-size kernel string to an owned `String`.
pub(crate) fn c_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

/// Copies `src` into a fixed-size kernel string, always leaving a NUL.
#[cfg(test)]
pub(crate) fn fill_c_string(dst: &mut [u8], src: &str) {
    let n = src.len().min(dst.len().saturating_sub(1));
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n..].fill(0);
}

/// `struct v4l2_capability`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

/// `struct v4l2_fmtdesc`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Fmtdesc {
    pub index: u32,
    pub type_: u32,
    pub flags: u32,
    pub description: [u8; 32],
    pub pixelformat: u32,
    pub mbus_code: u32,
    pub reserved: [u32; 3],
}

/// `struct v4l2_pix_format`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2PixFormat {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

/// `struct v4l2_meta_format`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2MetaFormat {
    pub dataformat: u32,
    pub buffersize: u32,
}

/// The 200-byte `fmt` union of `v4l2_format`.
///
/// One member of the kernel union (`v4l2_window`) holds pointers, so the union
/// is pointer-aligned. The zero-length array reproduces that alignment.
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct FormatUnion {
    pub raw: [u8; 200],
    _align: [c_ulong; 0],
}

/// `struct v4l2_format`
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2Format {
    pub type_: u32,
    pub fmt: FormatUnion,
}

impl V4l2Format {
    pub fn new(buf_type: u32) -> Self {
        let mut fmt = Self::zeroed();
        fmt.type_ = buf_type;
        fmt
    }

    /// Reads the union as `v4l2_pix_format`.
    pub fn pix(&self) -> V4l2PixFormat {
        bytemuck::pod_read_unaligned(&self.fmt.raw[..size_of::<V4l2PixFormat>()])
    }

    pub fn set_pix(&mut self, pix: &V4l2PixFormat) {
        self.fmt.raw[..size_of::<V4l2PixFormat>()].copy_from_slice(bytemuck::bytes_of(pix));
    }

    /// Reads the union as `v4l2_meta_format`.
    pub fn meta(&self) -> V4l2MetaFormat {
        bytemuck::pod_read_unaligned(&self.fmt.raw[..size_of::<V4l2MetaFormat>()])
    }

    pub fn set_meta(&mut self, meta: &V4l2MetaFormat) {
        self.fmt.raw[..size_of::<V4l2MetaFormat>()].copy_from_slice(bytemuck::bytes_of(meta));
    }
}

/// `struct v4l2_requestbuffers`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

/// Kernel `struct timeval` as laid out in the buffer descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Timeval {
    pub tv_sec: c_long,
    pub tv_usec: c_long,
}

/// `struct v4l2_timecode`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

/// The `m` union of `v4l2_buffer`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union BufferMemory {
    pub offset: u32,
    pub userptr: c_ulong,
    pub fd: i32,
}

// SAFETY: every member is an integer, all-zero is valid for each
unsafe impl Zeroable for BufferMemory {}

/// `struct v4l2_buffer`
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2Buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: Timeval,
    pub timecode: V4l2Timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: BufferMemory,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

impl V4l2Buffer {
    pub fn new(buf_type: u32, memory: u32, index: u32) -> Self {
        let mut buf = Self::zeroed();
        buf.type_ = buf_type;
        buf.memory = memory;
        buf.index = index;
        buf
    }

    /// Mapping offset returned by the driver for `V4L2_MEMORY_MMAP` buffers.
    pub fn offset(&self) -> u32 {
        // SAFETY: every bit pattern is a valid u32
        unsafe { self.m.offset }
    }
}

/// `struct v4l2_fract`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2Fract {
    pub numerator: u32,
    pub denominator: u32,
}

/// `struct v4l2_captureparm`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2CaptureParm {
    pub capability: u32,
    pub capturemode: u32,
    pub timeperframe: V4l2Fract,
    pub extendedmode: u32,
    pub readbuffers: u32,
    pub reserved: [u32; 4],
}

/// `struct v4l2_streamparm`
///
/// The `parm` union only contains 32-bit members, so unlike
/// [`V4l2Format`] it is 4-byte aligned.
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2Streamparm {
    pub type_: u32,
    pub parm: [u8; 200],
}

impl V4l2Streamparm {
    pub fn new(buf_type: u32) -> Self {
        let mut parm = Self::zeroed();
        parm.type_ = buf_type;
        parm
    }

    pub fn capture(&self) -> V4l2CaptureParm {
        bytemuck::pod_read_unaligned(&self.parm[..size_of::<V4l2CaptureParm>()])
    }

    pub fn set_capture(&mut self, capture: &V4l2CaptureParm) {
        self.parm[..size_of::<V4l2CaptureParm>()].copy_from_slice(bytemuck::bytes_of(capture));
    }
}

/// `struct v4l2_control`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Control {
    pub id: u32,
    pub value: i32,
}

/// `struct v4l2_queryctrl`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct V4l2Queryctrl {
    pub id: u32,
    pub type_: u32,
    pub name: [u8; 32],
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
    pub reserved: [u32; 2],
}

/// Value union of `v4l2_ext_control`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union ExtControlValue {
    pub value: i32,
    pub value64: i64,
    pub ptr: *mut c_void,
}

// SAFETY: integers and a null pointer are all-zero valid
unsafe impl Zeroable for ExtControlValue {}

/// `struct v4l2_ext_control`
///
/// Declared `__attribute__((packed))` in the kernel header.
#[repr(C, packed)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2ExtControl {
    pub id: u32,
    pub size: u32,
    pub reserved2: [u32; 1],
    pub value: ExtControlValue,
}

impl V4l2ExtControl {
    /// A pointer-payload control referring to `payload`.
    ///
    /// The returned record borrows nothing; the caller must keep `payload`
    /// alive and unmoved for as long as the record is passed to the kernel.
    pub fn with_payload(id: u32, payload: &mut [u8]) -> Self {
        let mut ctrl = Self::zeroed();
        ctrl.id = id;
        ctrl.size = payload.len() as u32;
        ctrl.value = ExtControlValue {
            ptr: payload.as_mut_ptr().cast(),
        };
        ctrl
    }
}

/// `struct v4l2_ext_controls`
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2ExtControls {
    pub which: u32,
    pub count: u32,
    pub error_idx: u32,
    pub request_fd: i32,
    pub reserved: [u32; 1],
    pub controls: *mut V4l2ExtControl,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2FrmsizeDiscrete {
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2FrmsizeStepwise {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union FrmsizeUnion {
    pub discrete: V4l2FrmsizeDiscrete,
    pub stepwise: V4l2FrmsizeStepwise,
}

// SAFETY: both members are plain u32 records
unsafe impl Zeroable for FrmsizeUnion {}

/// `struct v4l2_frmsizeenum`
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2Frmsizeenum {
    pub index: u32,
    pub pixel_format: u32,
    pub type_: u32,
    pub u: FrmsizeUnion,
    pub reserved: [u32; 2],
}

impl V4l2Frmsizeenum {
    pub fn discrete(&self) -> V4l2FrmsizeDiscrete {
        // SAFETY: any bit pattern is valid for the u32 members
        unsafe { self.u.discrete }
    }

    pub fn stepwise(&self) -> V4l2FrmsizeStepwise {
        // SAFETY: as above
        unsafe { self.u.stepwise }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct V4l2FrmivalStepwise {
    pub min: V4l2Fract,
    pub max: V4l2Fract,
    pub step: V4l2Fract,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union FrmivalUnion {
    pub discrete: V4l2Fract,
    pub stepwise: V4l2FrmivalStepwise,
}

// SAFETY: both members are plain u32 records
unsafe impl Zeroable for FrmivalUnion {}

/// `struct v4l2_frmivalenum`
#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
pub struct V4l2Frmivalenum {
    pub index: u32,
    pub pixel_format: u32,
    pub width: u32,
    pub height: u32,
    pub type_: u32,
    pub u: FrmivalUnion,
    pub reserved: [u32; 2],
}

impl V4l2Frmivalenum {
    pub fn discrete(&self) -> V4l2Fract {
        // SAFETY: any bit pattern is valid for the u32 members
        unsafe { self.u.discrete }
    }

    pub fn stepwise(&self) -> V4l2FrmivalStepwise {
        // SAFETY: as above
        unsafe { self.u.stepwise }
    }
}

// Layout checks against videodev2.h. These run at compile time.
const _: () = assert!(size_of::<V4l2Capability>() == 104);
const _: () = assert!(size_of::<V4l2Fmtdesc>() == 64);
const _: () = assert!(size_of::<V4l2PixFormat>() == 48);
const _: () = assert!(size_of::<V4l2MetaFormat>() == 8);
const _: () = assert!(size_of::<FormatUnion>() == 200);
const _: () = assert!(size_of::<V4l2Requestbuffers>() == 20);
const _: () = assert!(size_of::<V4l2Timecode>() == 16);
const _: () = assert!(size_of::<V4l2Fract>() == 8);
const _: () = assert!(size_of::<V4l2CaptureParm>() == 40);
const _: () = assert!(size_of::<V4l2Streamparm>() == 204);
const _: () = assert!(size_of::<V4l2Control>() == 8);
const _: () = assert!(size_of::<V4l2Queryctrl>() == 68);
const _: () = assert!(size_of::<V4l2ExtControl>() == 20);
const _: () = assert!(size_of::<V4l2Frmsizeenum>() == 44);
const _: () = assert!(size_of::<V4l2Frmivalenum>() == 52);

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<V4l2Format>() == 208);
    assert!(size_of::<V4l2Buffer>() == 88);
    assert!(size_of::<V4l2ExtControls>() == 32);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(size_of::<V4l2Format>() == 204);
    assert!(size_of::<V4l2Buffer>() == 68);
    assert!(size_of::<V4l2ExtControls>() == 24);
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_capability_offsets() {
        assert_eq!(offset_of!(V4l2Capability, card), 16);
        assert_eq!(offset_of!(V4l2Capability, bus_info), 48);
        assert_eq!(offset_of!(V4l2Capability, version), 80);
        assert_eq!(offset_of!(V4l2Capability, capabilities), 84);
        assert_eq!(offset_of!(V4l2Capability, device_caps), 88);
    }

    #[test]
    fn test_fmtdesc_offsets() {
        assert_eq!(offset_of!(V4l2Fmtdesc, description), 12);
        assert_eq!(offset_of!(V4l2Fmtdesc, pixelformat), 44);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_format_union_is_pointer_aligned() {
        assert_eq!(offset_of!(V4l2Format, fmt), 8);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_buffer_offsets_64() {
        assert_eq!(offset_of!(V4l2Buffer, field), 16);
        assert_eq!(offset_of!(V4l2Buffer, timestamp), 24);
        assert_eq!(offset_of!(V4l2Buffer, timecode), 40);
        assert_eq!(offset_of!(V4l2Buffer, sequence), 56);
        assert_eq!(offset_of!(V4l2Buffer, memory), 60);
        assert_eq!(offset_of!(V4l2Buffer, m), 64);
        assert_eq!(offset_of!(V4l2Buffer, length), 72);
        assert_eq!(offset_of!(V4l2Buffer, request_fd), 80);
    }

    #[test]
    fn test_streamparm_capture_offsets() {
        assert_eq!(offset_of!(V4l2Streamparm, parm), 4);
        assert_eq!(offset_of!(V4l2CaptureParm, timeperframe), 8);
    }

    #[test]
    fn test_queryctrl_offsets() {
        assert_eq!(offset_of!(V4l2Queryctrl, name), 8);
        assert_eq!(offset_of!(V4l2Queryctrl, minimum), 40);
        assert_eq!(offset_of!(V4l2Queryctrl, default_value), 52);
        assert_eq!(offset_of!(V4l2Queryctrl, flags), 56);
    }

    #[test]
    fn test_ext_control_is_packed() {
        assert_eq!(offset_of!(V4l2ExtControl, value), 12);
        assert_eq!(std::mem::align_of::<V4l2ExtControl>(), 1);
    }

    #[test]
    fn test_enum_union_offsets() {
        assert_eq!(offset_of!(V4l2Frmsizeenum, u), 12);
        assert_eq!(offset_of!(V4l2Frmsizeenum, reserved), 36);
        assert_eq!(offset_of!(V4l2Frmivalenum, u), 20);
        assert_eq!(offset_of!(V4l2Frmivalenum, reserved), 44);
    }

    #[test]
    fn test_pix_accessor_writes_union_prefix() {
        let mut fmt = V4l2Format::new(V4L2_BUF_TYPE_VIDEO_CAPTURE);
        let pix = V4l2PixFormat {
            width: 848,
            height: 480,
            pixelformat: 0x2036_315a,
            field: V4L2_FIELD_NONE,
            ..Default::default()
        };
        fmt.set_pix(&pix);
        assert_eq!(&fmt.fmt.raw[0..4], &848u32.to_ne_bytes());
        assert_eq!(&fmt.fmt.raw[4..8], &480u32.to_ne_bytes());
        assert_eq!(fmt.pix(), pix);
        assert!(fmt.fmt.raw[48..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_meta_accessor() {
        let mut fmt = V4l2Format::new(V4L2_BUF_TYPE_META_CAPTURE);
        let meta = V4l2MetaFormat {
            dataformat: 0x5858_3444,
            buffersize: 4096,
        };
        fmt.set_meta(&meta);
        assert_eq!(fmt.meta(), meta);
        assert_eq!(fmt.type_, V4L2_BUF_TYPE_META_CAPTURE);
    }

    #[test]
    fn test_streamparm_capture_accessor() {
        let mut parm = V4l2Streamparm::new(V4L2_BUF_TYPE_VIDEO_CAPTURE);
        let mut cap = parm.capture();
        assert_eq!(cap, V4l2CaptureParm::default());
        cap.timeperframe = V4l2Fract {
            numerator: 1,
            denominator: 30,
        };
        parm.set_capture(&cap);
        assert_eq!(parm.capture().timeperframe.denominator, 30);
    }

    #[test]
    fn test_ext_control_payload_pointer() {
        let mut blob = [0u8; 256];
        let ctrl = V4l2ExtControl::with_payload(0x009a_4003, &mut blob);
        let size = ctrl.size;
        let id = ctrl.id;
        assert_eq!(id, 0x009a_4003);
        assert_eq!(size, 256);
        // SAFETY: the pointer member was just written
        let ptr = unsafe { ctrl.value.ptr };
        assert_eq!(ptr as *const u8, blob.as_ptr());
    }

    #[test]
    fn test_c_string_helpers() {
        let mut field = [0xffu8; 16];
        fill_c_string(&mut field, "d4xx");
        assert_eq!(c_string(&field), "d4xx");

        fill_c_string(&mut field, "a-driver-name-longer-than-sixteen");
        assert_eq!(c_string(&field).len(), 15);
        assert_eq!(field[15], 0);

        assert_eq!(c_string(b"no-terminator"), "no-terminator");
    }

    #[test]
    fn test_buffer_type_raw() {
        assert_eq!(BufferType::VideoCapture.as_raw(), 1);
        assert_eq!(BufferType::MetaCapture.as_raw(), 13);
        assert_eq!(BufferType::from_raw(13), Some(BufferType::MetaCapture));
        assert_eq!(BufferType::from_raw(2), None);
    }
}
