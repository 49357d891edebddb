// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors
#![forbid(unsafe_code)]

//! Four-character format codes.
//!
//! V4L2 packs a code as `a | b << 8 | c << 16 | d << 24` regardless of host
//! byte order (`v4l2_fourcc()` in videodev2.h).

use core::{fmt, str::FromStr};

use crate::Error;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// 16-bit depth
    pub const Z16: FourCC = FourCC(*b"Z16 ");
    pub const UYVY: FourCC = FourCC(*b"UYVY");
    pub const YUYV: FourCC = FourCC(*b"YUYV");
    /// 8-bit infrared
    pub const GREY: FourCC = FourCC(*b"GREY");
    /// Interleaved left/right 8-bit infrared
    pub const Y8I: FourCC = FourCC(*b"Y8I ");
    /// Interleaved left/right 12-bit infrared
    pub const Y12I: FourCC = FourCC(*b"Y12I");
    pub const RGB3: FourCC = FourCC(*b"RGB3");
    /// Vendor metadata stream
    pub const D4XX: FourCC = FourCC(*b"D4XX");

    pub const fn new(code: &[u8; 4]) -> Self {
        FourCC(*code)
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn from_u32(val: u32) -> Self {
        FourCC(val.to_le_bytes())
    }

    /// Human readable name for the formats this crate knows about.
    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            FourCC::Z16 => "Depth 16-bit",
            FourCC::UYVY => "UYVY 4:2:2",
            FourCC::YUYV => "YUYV 4:2:2",
            FourCC::GREY => "Greyscale 8-bit",
            FourCC::Y8I => "Interleaved IR 8-bit",
            FourCC::Y12I => "Interleaved IR 12-bit",
            FourCC::RGB3 => "RGB 24-bit",
            FourCC::D4XX => "D4XX metadata",
            _ => return None,
        })
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(buf: &[u8; 4]) -> FourCC {
        FourCC(*buf)
    }
}

impl From<u32> for FourCC {
    fn from(val: u32) -> FourCC {
        FourCC::from_u32(val)
    }
}

impl From<FourCC> for u32 {
    fn from(val: FourCC) -> Self {
        val.to_u32()
    }
}

/// Parses up to four ASCII characters; short codes are space padded
/// (`"Z16"` is `"Z16 "`).
impl FromStr for FourCC {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a four-character code",
                s
            )));
        }
        let mut code = *b"    ";
        code[..s.len()].copy_from_slice(s.as_bytes());
        Ok(FourCC(code))
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => {
                let b = &self.0;
                write!(
                    f,
                    "{}{}{}{}",
                    core::ascii::escape_default(b[0]),
                    core::ascii::escape_default(b[1]),
                    core::ascii::escape_default(b[2]),
                    core::ascii::escape_default(b[3])
                )
            }
        }
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FourCC")
            .field(&format_args!("{} 0x{:08x}", self, self.to_u32()))
            .finish()
    }
}
