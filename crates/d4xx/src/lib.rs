// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! D4XX V4L2 protocol bindings
//!
//! Direct V4L2 access for validating RealSense D4XX MIPI camera drivers. The
//! crate speaks the kernel video-capture protocol itself: it computes request
//! codes, exchanges byte-exact kernel records, drives memory-mapped streaming
//! and decodes the camera's per-frame metadata.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use d4xx::discovery::{discover, Role};
//! use d4xx::device::{DeviceHandle, Format};
//! use d4xx::fourcc::FourCC;
//! use d4xx::records::BufferType;
//! use d4xx::stream::StreamSession;
//!
//! let cameras = discover();
//! let camera = cameras.first().ok_or("no camera")?;
//!
//! let depth = DeviceHandle::open(camera.path(Role::Depth))?;
//! let accepted = depth.set_format(&Format::video(848, 480, FourCC::Z16))?;
//! println!("streaming {}", accepted);
//!
//! let mut session = StreamSession::acquire(&depth, BufferType::VideoCapture, 4)?;
//! for frame in session.capture_frames(30, Duration::from_secs(2))? {
//!     println!("seq {} {} bytes", frame.descriptor.sequence, frame.data.len());
//! }
//! session.release();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Layers
//!
//! - [`ioctl`]: request code packing, computed at compile time
//! - [`records`]: `#[repr(C)]` kernel records with size assertions
//! - [`device`]: an owned device node and its typed control requests
//! - [`stream`]: the memory-mapped buffer lifecycle
//! - [`discovery`]: grouping device nodes into cameras by role
//! - [`metadata`]: per-frame metadata decoding and CRC validation
//!
//! The library is single threaded and blocking. Concurrent capture from
//! several streams is done by interleaving calls on independent sessions.

#[cfg(not(target_os = "linux"))]
compile_error!("d4xx binds the Linux V4L2 ABI and only builds for Linux targets");

use std::{error, fmt, io, num::TryFromIntError, path::PathBuf, time::Duration};

/// Error type for D4XX protocol operations
#[derive(Debug)]
pub enum Error {
    /// The device node could not be opened (missing, busy, permission)
    Open(PathBuf, io::Error),

    /// A V4L2 request failed; carries the request name and the OS error
    Ioctl(&'static str, io::Error),

    /// Mapping or unmapping a streaming buffer failed
    Mmap(io::Error),

    /// No frame became ready within the dequeue timeout
    Timeout(Duration),

    /// The device handle has already been closed
    Closed,

    /// The driver returned a buffer index outside the session
    InvalidBuffer(u32),

    /// The driver granted zero streaming buffers
    NoBuffers,

    /// A caller supplied value was rejected before reaching the driver
    InvalidArgument(String),

    /// Integer conversion error (try_from failed)
    TryFromInt(TryFromIntError),
}

impl Error {
    /// Raw OS error code, when the error came from the kernel.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Open(_, err) | Error::Ioctl(_, err) | Error::Mmap(err) => err.raw_os_error(),
            _ => None,
        }
    }

    /// True for the dequeue timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open(path, err) => write!(f, "cannot open {}: {}", path.display(), err),
            Error::Ioctl(request, err) => write!(f, "{} failed: {}", request, err),
            Error::Mmap(err) => write!(f, "buffer mapping failed: {}", err),
            Error::Timeout(timeout) => {
                write!(f, "no frame within {:.3}s", timeout.as_secs_f64())
            }
            Error::Closed => write!(f, "device handle is closed"),
            Error::InvalidBuffer(index) => write!(f, "driver returned unknown buffer {}", index),
            Error::NoBuffers => write!(f, "driver granted no streaming buffers"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::TryFromInt(err) => write!(f, "Integer conversion error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Open(_, err) => Some(err),
            Error::Ioctl(_, err) => Some(err),
            Error::Mmap(err) => Some(err),
            Error::TryFromInt(err) => Some(err),
            Error::Timeout(_)
            | Error::Closed
            | Error::InvalidBuffer(_)
            | Error::NoBuffers
            | Error::InvalidArgument(_) => None,
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::TryFromInt(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Request code packing for the V4L2 ioctls used by this crate.
pub mod ioctl;

/// Byte-exact kernel records.
pub mod records;

/// Four-character pixel and metadata format codes.
pub mod fourcc;

/// Control identifiers, control descriptors and firmware version decoding.
pub mod controls;

/// An open V4L2 device node.
pub mod device;

/// Memory-mapped streaming sessions.
pub mod stream;

/// Camera topology discovery.
pub mod discovery;

/// Per-frame metadata decoding.
pub mod metadata;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_errno_and_source() {
        let err = Error::Ioctl("VIDIOC_QUERYCAP", io::Error::from_raw_os_error(libc::ENOTTY));
        assert_eq!(err.errno(), Some(libc::ENOTTY));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("VIDIOC_QUERYCAP failed"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = Error::Timeout(Duration::from_millis(1500));
        assert!(err.is_timeout());
        assert_eq!(err.errno(), None);
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "no frame within 1.500s");
    }

    #[test]
    fn test_open_error_display() {
        let err = Error::Open(
            PathBuf::from("/dev/video99"),
            io::Error::from_raw_os_error(libc::ENOENT),
        );
        assert!(err.to_string().contains("/dev/video99"));
        assert_eq!(err.errno(), Some(libc::ENOENT));
    }

    #[test]
    fn test_try_from_int() {
        let err: Error = u8::try_from(300u32).unwrap_err().into();
        assert!(matches!(err, Error::TryFromInt(_)));
    }
}
