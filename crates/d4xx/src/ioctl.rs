// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! V4L2 request code generation
//!
//! Linux packs every ioctl request number from four bit fields:
//!
//! | Field     | Bits | Shift |
//! |-----------|------|-------|
//! | number    | 8    | 0     |
//! | type      | 8    | 8     |
//! | size      | 14   | 16    |
//! | direction | 2    | 30    |
//!
//! The request codes used by this crate are computed once, at compile time,
//! from the byte size of the records in [`crate::records`]. The size of every
//! record is asserted against the kernel ABI in the same module, so a layout
//! defect fails the build instead of corrupting memory at run time.

use std::fmt;
use std::mem::size_of;

use crate::records::{
    V4l2Buffer, V4l2Capability, V4l2Control, V4l2ExtControls, V4l2Fmtdesc, V4l2Format,
    V4l2Frmivalenum, V4l2Frmsizeenum, V4l2Queryctrl, V4l2Requestbuffers, V4l2Streamparm,
};

const NR_BITS: u32 = 8;
const TYPE_BITS: u32 = 8;
const SIZE_BITS: u32 = 14;
const DIR_BITS: u32 = 2;

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = NR_SHIFT + NR_BITS;
const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
const DIR_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

/// Largest payload size representable in the size field.
pub const MAX_PAYLOAD_SIZE: usize = (1 << SIZE_BITS) - 1;

/// Type tag shared by every V4L2 request.
pub const V4L2_TYPE: u8 = b'V';

/// Data transfer direction, seen from user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// No payload is exchanged.
    None,
    /// User space writes the payload to the kernel.
    Write,
    /// User space reads the payload from the kernel.
    Read,
    /// The payload travels both ways.
    ReadWrite,
}

impl Direction {
    /// Raw value of the direction field.
    pub const fn bits(self) -> u32 {
        match self {
            Direction::None => 0,
            Direction::Write => 1,
            Direction::Read => 2,
            Direction::ReadWrite => 3,
        }
    }
}

/// Packs a request code from its four fields.
///
/// Deterministic and free of side effects. Panics when `size` does not fit the
/// 14-bit size field; every call in this crate is evaluated in a `const`
/// context, so such a panic surfaces as a compile error.
pub const fn encode(direction: Direction, type_tag: u8, number: u8, size: usize) -> u32 {
    assert!(size <= MAX_PAYLOAD_SIZE, "ioctl payload exceeds the size field");
    (direction.bits() << DIR_SHIFT)
        | ((type_tag as u32) << TYPE_SHIFT)
        | ((number as u32) << NR_SHIFT)
        | ((size as u32) << SIZE_SHIFT)
}

/// Equivalent of the kernel's `_IOR`.
pub const fn ior(type_tag: u8, number: u8, size: usize) -> u32 {
    encode(Direction::Read, type_tag, number, size)
}

/// Equivalent of the kernel's `_IOW`.
pub const fn iow(type_tag: u8, number: u8, size: usize) -> u32 {
    encode(Direction::Write, type_tag, number, size)
}

/// Equivalent of the kernel's `_IOWR`.
pub const fn iowr(type_tag: u8, number: u8, size: usize) -> u32 {
    encode(Direction::ReadWrite, type_tag, number, size)
}

/// A named request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Request {
    name: &'static str,
    code: u32,
}

impl Request {
    const fn new(name: &'static str, code: u32) -> Self {
        Self { name, code }
    }

    /// Kernel name of the request (e.g. `VIDIOC_QUERYCAP`)
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Encoded request number.
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// Direction field decoded back from the code.
    pub const fn direction(&self) -> Direction {
        match (self.code >> DIR_SHIFT) & ((1 << DIR_BITS) - 1) {
            0 => Direction::None,
            1 => Direction::Write,
            2 => Direction::Read,
            _ => Direction::ReadWrite,
        }
    }

    /// Payload size field decoded back from the code.
    pub const fn size(&self) -> usize {
        ((self.code >> SIZE_SHIFT) & ((1 << SIZE_BITS) - 1)) as usize
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08x})", self.name, self.code)
    }
}

pub const VIDIOC_QUERYCAP: Request = Request::new(
    "VIDIOC_QUERYCAP",
    ior(V4L2_TYPE, 0, size_of::<V4l2Capability>()),
);
pub const VIDIOC_ENUM_FMT: Request = Request::new(
    "VIDIOC_ENUM_FMT",
    iowr(V4L2_TYPE, 2, size_of::<V4l2Fmtdesc>()),
);
pub const VIDIOC_G_FMT: Request =
    Request::new("VIDIOC_G_FMT", iowr(V4L2_TYPE, 4, size_of::<V4l2Format>()));
pub const VIDIOC_S_FMT: Request =
    Request::new("VIDIOC_S_FMT", iowr(V4L2_TYPE, 5, size_of::<V4l2Format>()));
pub const VIDIOC_REQBUFS: Request = Request::new(
    "VIDIOC_REQBUFS",
    iowr(V4L2_TYPE, 8, size_of::<V4l2Requestbuffers>()),
);
pub const VIDIOC_QUERYBUF: Request = Request::new(
    "VIDIOC_QUERYBUF",
    iowr(V4L2_TYPE, 9, size_of::<V4l2Buffer>()),
);
pub const VIDIOC_QBUF: Request =
    Request::new("VIDIOC_QBUF", iowr(V4L2_TYPE, 15, size_of::<V4l2Buffer>()));
pub const VIDIOC_DQBUF: Request =
    Request::new("VIDIOC_DQBUF", iowr(V4L2_TYPE, 17, size_of::<V4l2Buffer>()));
/// Stream start takes the buffer type as a bare `int`, not a record.
pub const VIDIOC_STREAMON: Request = Request::new(
    "VIDIOC_STREAMON",
    iow(V4L2_TYPE, 18, size_of::<libc::c_int>()),
);
pub const VIDIOC_STREAMOFF: Request = Request::new(
    "VIDIOC_STREAMOFF",
    iow(V4L2_TYPE, 19, size_of::<libc::c_int>()),
);
pub const VIDIOC_G_PARM: Request = Request::new(
    "VIDIOC_G_PARM",
    iowr(V4L2_TYPE, 21, size_of::<V4l2Streamparm>()),
);
pub const VIDIOC_S_PARM: Request = Request::new(
    "VIDIOC_S_PARM",
    iowr(V4L2_TYPE, 22, size_of::<V4l2Streamparm>()),
);
pub const VIDIOC_G_CTRL: Request =
    Request::new("VIDIOC_G_CTRL", iowr(V4L2_TYPE, 27, size_of::<V4l2Control>()));
pub const VIDIOC_S_CTRL: Request =
    Request::new("VIDIOC_S_CTRL", iowr(V4L2_TYPE, 28, size_of::<V4l2Control>()));
pub const VIDIOC_QUERYCTRL: Request = Request::new(
    "VIDIOC_QUERYCTRL",
    iowr(V4L2_TYPE, 36, size_of::<V4l2Queryctrl>()),
);
pub const VIDIOC_G_EXT_CTRLS: Request = Request::new(
    "VIDIOC_G_EXT_CTRLS",
    iowr(V4L2_TYPE, 71, size_of::<V4l2ExtControls>()),
);
pub const VIDIOC_S_EXT_CTRLS: Request = Request::new(
    "VIDIOC_S_EXT_CTRLS",
    iowr(V4L2_TYPE, 72, size_of::<V4l2ExtControls>()),
);
pub const VIDIOC_ENUM_FRAMESIZES: Request = Request::new(
    "VIDIOC_ENUM_FRAMESIZES",
    iowr(V4L2_TYPE, 74, size_of::<V4l2Frmsizeenum>()),
);
pub const VIDIOC_ENUM_FRAMEINTERVALS: Request = Request::new(
    "VIDIOC_ENUM_FRAMEINTERVALS",
    iowr(V4L2_TYPE, 75, size_of::<V4l2Frmivalenum>()),
);

/// Every request issued by this crate, in request-number order.
pub const ALL_REQUESTS: [Request; 19] = [
    VIDIOC_QUERYCAP,
    VIDIOC_ENUM_FMT,
    VIDIOC_G_FMT,
    VIDIOC_S_FMT,
    VIDIOC_REQBUFS,
    VIDIOC_QUERYBUF,
    VIDIOC_QBUF,
    VIDIOC_DQBUF,
    VIDIOC_STREAMON,
    VIDIOC_STREAMOFF,
    VIDIOC_G_PARM,
    VIDIOC_S_PARM,
    VIDIOC_G_CTRL,
    VIDIOC_S_CTRL,
    VIDIOC_QUERYCTRL,
    VIDIOC_G_EXT_CTRLS,
    VIDIOC_S_EXT_CTRLS,
    VIDIOC_ENUM_FRAMESIZES,
    VIDIOC_ENUM_FRAMEINTERVALS,
];
