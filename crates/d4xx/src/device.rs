// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! V4L2 device handle
//!
//! [`DeviceHandle`] owns exactly one open file descriptor for a V4L2 node and
//! exposes the typed control operations the D4XX driver supports:
//!
//! - identity and capability ([`DeviceHandle::query_capability`])
//! - format negotiation ([`DeviceHandle::get_format`], [`DeviceHandle::set_format`])
//! - frame rate ([`DeviceHandle::get_streaming_parameters`],
//!   [`DeviceHandle::set_streaming_parameters`])
//! - lazy enumeration of formats, frame sizes, frame intervals and controls
//! - standard and extended controls
//!
//! Every call is a direct pass-through to the kernel; nothing is cached. The
//! driver is free to adjust what it is given, so [`DeviceHandle::set_format`]
//! returns the record the driver accepted, which callers should treat as the
//! effective format.
//!
//! # Example
//!
//! ```no_run
//! use d4xx::device::DeviceHandle;
//! use d4xx::fourcc::FourCC;
//!
//! let dev = DeviceHandle::open("/dev/video0")?;
//! let cap = dev.query_capability()?;
//! println!("{} on {} ({})", cap.card, cap.bus_info, cap.driver);
//!
//! for size in dev.enumerate_frame_sizes(FourCC::Z16) {
//!     println!("  {}", size?);
//! }
//! # Ok::<(), d4xx::Error>(())
//! ```

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use bytemuck::Zeroable;
use log::debug;

use crate::controls::{
    ControlDescriptor, FirmwareVersion, DS5_CAMERA_CID_FW_VERSION, V4L2_CTRL_FLAG_NEXT_CTRL,
};
use crate::fourcc::FourCC;
use crate::ioctl::{self, Request};
use crate::records::{
    c_string, BufferType, V4l2Capability, V4l2Control, V4l2ExtControl, V4l2ExtControls,
    V4l2Fmtdesc, V4l2Format, V4l2Fract, V4l2Frmivalenum, V4l2Frmsizeenum, V4l2MetaFormat,
    V4l2PixFormat, V4l2Queryctrl, V4l2Streamparm, V4L2_CAP_DEVICE_CAPS, V4L2_CAP_META_CAPTURE,
    V4L2_CAP_STREAMING, V4L2_CAP_TIMEPERFRAME, V4L2_CAP_VIDEO_CAPTURE, V4L2_FIELD_ANY,
    V4L2_FRMIVAL_TYPE_CONTINUOUS, V4L2_FRMIVAL_TYPE_DISCRETE, V4L2_FRMIVAL_TYPE_STEPWISE,
    V4L2_FRMSIZE_TYPE_CONTINUOUS, V4L2_FRMSIZE_TYPE_DISCRETE, V4L2_FRMSIZE_TYPE_STEPWISE,
};
use crate::{Error, Result};

/// `which` value selecting current control values.
const V4L2_CTRL_WHICH_CUR_VAL: u32 = 0;

/// An open V4L2 device node.
///
/// Opened read-write and non-blocking. The descriptor is released exactly
/// once, either by [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct DeviceHandle {
    path: PathBuf,
    fd: Option<OwnedFd>,
}

impl DeviceHandle {
    /// Opens the node at `path`.
    ///
    /// Fails with [`Error::Open`] when the node is missing, busy or not
    /// accessible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|err| Error::Open(path.to_path_buf(), err))?;
        debug!("opened {} (fd {})", path.display(), file.as_raw_fd());
        Ok(DeviceHandle {
            path: path.to_path_buf(),
            fd: Some(OwnedFd::from(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// Closes the descriptor. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            debug!("closing {} (fd {})", self.path.display(), fd.as_raw_fd());
            drop(fd);
        }
    }

    pub(crate) fn raw_fd(&self) -> Result<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd()).ok_or(Error::Closed)
    }

    /// Issues `request` with `arg` as its payload, retrying on `EINTR`.
    ///
    /// The payload type must have the byte size encoded in the request.
    pub(crate) fn ioctl<T>(&self, request: Request, arg: &mut T) -> Result<()> {
        if size_of::<T>() != request.size() {
            return Err(Error::InvalidArgument(format!(
                "{} expects a {} byte payload, got {}",
                request.name(),
                request.size(),
                size_of::<T>()
            )));
        }
        let fd = self.raw_fd()?;
        loop {
            // SAFETY: `arg` is a live, exclusively borrowed record whose size
            // matches the one encoded in the request, so the kernel reads and
            // writes within its bounds.
            let ret = unsafe { libc::ioctl(fd, request.code() as _, arg as *mut T) };
            if ret != -1 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(Error::Ioctl(request.name(), err));
            }
        }
    }

    /// `VIDIOC_QUERYCAP`
    pub fn query_capability(&self) -> Result<Capability> {
        let mut cap = V4l2Capability::zeroed();
        self.ioctl(ioctl::VIDIOC_QUERYCAP, &mut cap)?;
        Ok(Capability::from(&cap))
    }

    /// `VIDIOC_G_FMT`
    pub fn get_format(&self, buf_type: BufferType) -> Result<Format> {
        let mut fmt = V4l2Format::new(buf_type.as_raw());
        self.ioctl(ioctl::VIDIOC_G_FMT, &mut fmt)?;
        Format::from_record(&fmt)
    }

    /// `VIDIOC_S_FMT`
    ///
    /// Returns the format the driver accepted, which may be clamped to the
    /// nearest supported geometry.
    pub fn set_format(&self, format: &Format) -> Result<Format> {
        let mut fmt = format.to_record();
        self.ioctl(ioctl::VIDIOC_S_FMT, &mut fmt)?;
        let accepted = Format::from_record(&fmt)?;
        if !accepted.matches_request(format) {
            debug!(
                "{}: requested {} but driver set {}",
                self.path.display(),
                format,
                accepted
            );
        }
        Ok(accepted)
    }

    /// `VIDIOC_G_PARM`
    pub fn get_streaming_parameters(&self, buf_type: BufferType) -> Result<StreamParameters> {
        let mut parm = V4l2Streamparm::new(buf_type.as_raw());
        self.ioctl(ioctl::VIDIOC_G_PARM, &mut parm)?;
        Ok(StreamParameters::from(&parm))
    }

    /// `VIDIOC_S_PARM` with a time-per-frame of `1/fps`.
    ///
    /// Some backends do not implement frame-rate selection and answer with
    /// `EBUSY`, `ENOTTY` or `EINVAL`. Those replies are not failures; the
    /// call returns `Ok(None)` and the driver keeps its current rate.
    pub fn set_streaming_parameters(
        &self,
        buf_type: BufferType,
        fps: u32,
    ) -> Result<Option<StreamParameters>> {
        if fps == 0 {
            return Err(Error::InvalidArgument("frame rate must be non-zero".into()));
        }
        let mut parm = V4l2Streamparm::new(buf_type.as_raw());
        let mut capture = parm.capture();
        capture.timeperframe = V4l2Fract {
            numerator: 1,
            denominator: fps,
        };
        parm.set_capture(&capture);

        match self.ioctl(ioctl::VIDIOC_S_PARM, &mut parm) {
            Ok(()) => Ok(Some(StreamParameters::from(&parm))),
            Err(err) if is_soft_parm_rejection(&err) => {
                debug!(
                    "{}: driver does not accept {} fps ({}), keeping current rate",
                    self.path.display(),
                    fps,
                    err
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// `VIDIOC_ENUM_FMT`, from index 0 until the driver reports exhaustion.
    pub fn enumerate_formats(&self, buf_type: BufferType) -> Enumeration<'_, FormatDescription> {
        let mut index = 0;
        Enumeration::new(move || {
            let mut desc = V4l2Fmtdesc::zeroed();
            desc.index = index;
            desc.type_ = buf_type.as_raw();
            match self.ioctl(ioctl::VIDIOC_ENUM_FMT, &mut desc) {
                Ok(()) => {
                    index += 1;
                    Ok(Some(FormatDescription::from(&desc)))
                }
                Err(err) => end_of_enumeration(err),
            }
        })
    }

    /// `VIDIOC_ENUM_FRAMESIZES` for `fourcc`.
    pub fn enumerate_frame_sizes(&self, fourcc: FourCC) -> Enumeration<'_, FrameSize> {
        let mut index = 0;
        Enumeration::new(move || {
            let mut size = V4l2Frmsizeenum::zeroed();
            size.index = index;
            size.pixel_format = fourcc.to_u32();
            match self.ioctl(ioctl::VIDIOC_ENUM_FRAMESIZES, &mut size) {
                Ok(()) => {
                    index += 1;
                    Ok(Some(FrameSize::from_record(&size)?))
                }
                Err(err) => end_of_enumeration(err),
            }
        })
    }

    /// `VIDIOC_ENUM_FRAMEINTERVALS` for one format and geometry.
    pub fn enumerate_frame_intervals(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
    ) -> Enumeration<'_, FrameInterval> {
        let mut index = 0;
        Enumeration::new(move || {
            let mut ival = V4l2Frmivalenum::zeroed();
            ival.index = index;
            ival.pixel_format = fourcc.to_u32();
            ival.width = width;
            ival.height = height;
            match self.ioctl(ioctl::VIDIOC_ENUM_FRAMEINTERVALS, &mut ival) {
                Ok(()) => {
                    index += 1;
                    Ok(Some(FrameInterval::from_record(&ival)?))
                }
                Err(err) => end_of_enumeration(err),
            }
        })
    }

    /// Walks every control with `V4L2_CTRL_FLAG_NEXT_CTRL`, skipping
    /// disabled ones.
    pub fn enumerate_controls(&self) -> Enumeration<'_, ControlDescriptor> {
        let mut next_id = V4L2_CTRL_FLAG_NEXT_CTRL;
        Enumeration::new(move || loop {
            let desc = match self.query_control(next_id) {
                Ok(desc) => desc,
                Err(err) => return end_of_enumeration(err),
            };
            next_id = desc.id | V4L2_CTRL_FLAG_NEXT_CTRL;
            if !desc.is_disabled() {
                return Ok(Some(desc));
            }
        })
    }

    /// `VIDIOC_QUERYCTRL`
    pub fn query_control(&self, id: u32) -> Result<ControlDescriptor> {
        let mut q = V4l2Queryctrl::zeroed();
        q.id = id;
        self.ioctl(ioctl::VIDIOC_QUERYCTRL, &mut q)?;
        Ok(ControlDescriptor::from(&q))
    }

    /// `VIDIOC_G_CTRL`
    pub fn get_control(&self, id: u32) -> Result<i32> {
        let mut ctrl = V4l2Control { id, value: 0 };
        self.ioctl(ioctl::VIDIOC_G_CTRL, &mut ctrl)?;
        Ok(ctrl.value)
    }

    /// `VIDIOC_S_CTRL`, returning the value the driver stored.
    pub fn set_control(&self, id: u32, value: i32) -> Result<i32> {
        let mut ctrl = V4l2Control { id, value };
        self.ioctl(ioctl::VIDIOC_S_CTRL, &mut ctrl)?;
        Ok(ctrl.value)
    }

    /// `VIDIOC_G_EXT_CTRLS` for a single pointer-payload control of `size`
    /// bytes.
    pub fn get_extended_control(&self, id: u32, size: usize) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; size];
        self.ext_control(ioctl::VIDIOC_G_EXT_CTRLS, id, &mut payload)?;
        Ok(payload)
    }

    /// `VIDIOC_S_EXT_CTRLS` for a single pointer-payload control.
    pub fn set_extended_control(&self, id: u32, data: &[u8]) -> Result<()> {
        let mut payload = data.to_vec();
        self.ext_control(ioctl::VIDIOC_S_EXT_CTRLS, id, &mut payload)
    }

    fn ext_control(&self, request: Request, id: u32, payload: &mut [u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "control 0x{:08x}: empty payload",
                id
            )));
        }
        u32::try_from(payload.len())?;
        let mut ctrl = V4l2ExtControl::with_payload(id, payload);
        let mut ctrls = V4l2ExtControls::zeroed();
        ctrls.which = V4L2_CTRL_WHICH_CUR_VAL;
        ctrls.count = 1;
        ctrls.controls = &mut ctrl;
        self.ioctl(request, &mut ctrls)
    }

    /// Reads a `U8` array control.
    pub fn read_u8_array(&self, id: u32, len: usize) -> Result<Vec<u8>> {
        self.get_extended_control(id, len)
    }

    /// Reads a `U16` array control of `count` elements.
    pub fn read_u16_array(&self, id: u32, count: usize) -> Result<Vec<u16>> {
        let raw = self.get_extended_control(id, array_len::<u16>(id, count)?)?;
        Ok(raw
            .chunks_exact(size_of::<u16>())
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect())
    }

    /// Reads a `U32` array control of `count` elements.
    pub fn read_u32_array(&self, id: u32, count: usize) -> Result<Vec<u32>> {
        let raw = self.get_extended_control(id, array_len::<u32>(id, count)?)?;
        Ok(raw
            .chunks_exact(size_of::<u32>())
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Writes a `U8` array control.
    pub fn write_u8_array(&self, id: u32, data: &[u8]) -> Result<()> {
        self.set_extended_control(id, data)
    }

    /// Reads and unpacks the camera firmware version control.
    pub fn firmware_version(&self) -> Result<FirmwareVersion> {
        self.get_control(DS5_CAMERA_CID_FW_VERSION)
            .map(FirmwareVersion::from_raw)
    }
}

fn is_soft_parm_rejection(err: &Error) -> bool {
    matches!(err, Error::Ioctl(_, _))
        && matches!(err.errno(), Some(libc::EBUSY | libc::ENOTTY | libc::EINVAL))
}

/// Byte length of a `count`-element array control.
fn array_len<T>(id: u32, count: usize) -> Result<usize> {
    count.checked_mul(size_of::<T>()).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "control 0x{:08x}: {} elements overflow",
            id, count
        ))
    })
}

/// `EINVAL` from an enumeration request means "no entry at this index".
fn end_of_enumeration<T>(err: Error) -> Result<Option<T>> {
    if err.errno() == Some(libc::EINVAL) {
        Ok(None)
    } else {
        Err(err)
    }
}

/// A finite, lazily evaluated sequence of enumeration replies.
///
/// Each item issues one request. The sequence ends when the driver reports
/// exhaustion. Any other failure is yielded once as an `Err` item, after
/// which the sequence is finished. Calling the enumerating method again
/// starts over from the first entry.
pub struct Enumeration<'a, T> {
    step: Option<Box<dyn FnMut() -> Result<Option<T>> + 'a>>,
}

impl<'a, T> Enumeration<'a, T> {
    fn new(step: impl FnMut() -> Result<Option<T>> + 'a) -> Self {
        Enumeration {
            step: Some(Box::new(step)),
        }
    }
}

impl<T> Iterator for Enumeration<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        let step = self.step.as_mut()?;
        match step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.step = None;
                None
            }
            Err(err) => {
                debug!("enumeration failed: {}", err);
                self.step = None;
                Some(Err(err))
            }
        }
    }
}

impl<T> std::iter::FusedIterator for Enumeration<'_, T> {}

/// Device identity and capabilities from `VIDIOC_QUERYCAP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub driver: String,
    pub card: String,
    pub bus_info: String,
    pub version: u32,
    /// Capabilities of the whole physical device
    pub capabilities: u32,
    /// Capabilities of this node, valid when `V4L2_CAP_DEVICE_CAPS` is set
    pub device_caps: u32,
}

impl Capability {
    /// Capabilities of this node, falling back to the device-wide mask.
    pub fn node_caps(&self) -> u32 {
        if self.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
            self.device_caps
        } else {
            self.capabilities
        }
    }

    pub fn has_video_capture(&self) -> bool {
        self.node_caps() & V4L2_CAP_VIDEO_CAPTURE != 0
    }

    pub fn has_meta_capture(&self) -> bool {
        self.node_caps() & V4L2_CAP_META_CAPTURE != 0
    }

    pub fn has_streaming(&self) -> bool {
        self.node_caps() & V4L2_CAP_STREAMING != 0
    }

    /// Kernel version triple encoded in `version`.
    pub fn kernel_version(&self) -> (u32, u32, u32) {
        (
            (self.version >> 16) & 0xff,
            (self.version >> 8) & 0xff,
            self.version & 0xff,
        )
    }
}

impl From<&V4l2Capability> for Capability {
    fn from(cap: &V4l2Capability) -> Self {
        Capability {
            driver: c_string(&cap.driver),
            card: c_string(&cap.card),
            bus_info: c_string(&cap.bus_info),
            version: cap.version,
            capabilities: cap.capabilities,
            device_caps: cap.device_caps,
        }
    }
}

/// Width × height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Image geometry of a video capture node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    pub field: u32,
    pub bytes_per_line: u32,
    pub size_image: u32,
}

/// Data format of a metadata capture node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaFormat {
    pub fourcc: FourCC,
    pub buffer_size: u32,
}

/// A `v4l2_format`, discriminated by the buffer type it was read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Video(PixelFormat),
    Meta(MetaFormat),
}

impl Format {
    /// A video capture request. The driver fills in the stride and size.
    pub fn video(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format::Video(PixelFormat {
            width,
            height,
            fourcc,
            field: V4L2_FIELD_ANY,
            bytes_per_line: 0,
            size_image: 0,
        })
    }

    /// A metadata capture request.
    pub fn meta(fourcc: FourCC) -> Self {
        Format::Meta(MetaFormat {
            fourcc,
            buffer_size: 0,
        })
    }

    pub fn buffer_type(&self) -> BufferType {
        match self {
            Format::Video(_) => BufferType::VideoCapture,
            Format::Meta(_) => BufferType::MetaCapture,
        }
    }

    pub fn fourcc(&self) -> FourCC {
        match self {
            Format::Video(pix) => pix.fourcc,
            Format::Meta(meta) => meta.fourcc,
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Format::Video(pix) => Some(Resolution::new(pix.width, pix.height)),
            Format::Meta(_) => None,
        }
    }

    /// True when `self` carries the geometry and code that were requested.
    pub fn matches_request(&self, request: &Format) -> bool {
        match (self, request) {
            (Format::Video(a), Format::Video(b)) => {
                a.width == b.width && a.height == b.height && a.fourcc == b.fourcc
            }
            (Format::Meta(a), Format::Meta(b)) => a.fourcc == b.fourcc,
            _ => false,
        }
    }

    pub fn to_record(&self) -> V4l2Format {
        let mut fmt = V4l2Format::new(self.buffer_type().as_raw());
        match self {
            Format::Video(pix) => fmt.set_pix(&V4l2PixFormat {
                width: pix.width,
                height: pix.height,
                pixelformat: pix.fourcc.to_u32(),
                field: pix.field,
                bytesperline: pix.bytes_per_line,
                sizeimage: pix.size_image,
                ..Default::default()
            }),
            Format::Meta(meta) => fmt.set_meta(&V4l2MetaFormat {
                dataformat: meta.fourcc.to_u32(),
                buffersize: meta.buffer_size,
            }),
        }
        fmt
    }

    /// Interprets the union according to the record's buffer type.
    pub fn from_record(fmt: &V4l2Format) -> Result<Self> {
        match BufferType::from_raw(fmt.type_) {
            Some(BufferType::VideoCapture) => {
                let pix = fmt.pix();
                Ok(Format::Video(PixelFormat {
                    width: pix.width,
                    height: pix.height,
                    fourcc: FourCC::from(pix.pixelformat),
                    field: pix.field,
                    bytes_per_line: pix.bytesperline,
                    size_image: pix.sizeimage,
                }))
            }
            Some(BufferType::MetaCapture) => {
                let meta = fmt.meta();
                Ok(Format::Meta(MetaFormat {
                    fourcc: FourCC::from(meta.dataformat),
                    buffer_size: meta.buffersize,
                }))
            }
            None => Err(Error::InvalidArgument(format!(
                "unsupported buffer type {}",
                fmt.type_
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Video(pix) => write!(f, "{} {}x{}", pix.fourcc, pix.width, pix.height),
            Format::Meta(meta) => write!(f, "{} meta ({} bytes)", meta.fourcc, meta.buffer_size),
        }
    }
}

/// One `VIDIOC_ENUM_FMT` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    pub index: u32,
    pub fourcc: FourCC,
    pub description: String,
    pub flags: u32,
}

impl From<&V4l2Fmtdesc> for FormatDescription {
    fn from(desc: &V4l2Fmtdesc) -> Self {
        FormatDescription {
            index: desc.index,
            fourcc: FourCC::from(desc.pixelformat),
            description: c_string(&desc.description),
            flags: desc.flags,
        }
    }
}

/// A rational number, used for frame intervals (seconds per frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    /// Frames per second for an interval, `None` when the numerator is 0.
    pub fn fps(&self) -> Option<f64> {
        if self.numerator == 0 {
            None
        } else {
            Some(self.denominator as f64 / self.numerator as f64)
        }
    }
}

impl From<V4l2Fract> for Fraction {
    fn from(f: V4l2Fract) -> Self {
        Fraction {
            numerator: f.numerator,
            denominator: f.denominator,
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Streaming parameters from `VIDIOC_G_PARM` / `VIDIOC_S_PARM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParameters {
    pub capability: u32,
    pub capture_mode: u32,
    pub time_per_frame: Fraction,
    pub read_buffers: u32,
}

impl StreamParameters {
    pub fn supports_time_per_frame(&self) -> bool {
        self.capability & V4L2_CAP_TIMEPERFRAME != 0
    }

    pub fn fps(&self) -> Option<f64> {
        self.time_per_frame.fps()
    }
}

impl From<&V4l2Streamparm> for StreamParameters {
    fn from(parm: &V4l2Streamparm) -> Self {
        let capture = parm.capture();
        StreamParameters {
            capability: capture.capability,
            capture_mode: capture.capturemode,
            time_per_frame: Fraction::from(capture.timeperframe),
            read_buffers: capture.readbuffers,
        }
    }
}

/// One `VIDIOC_ENUM_FRAMESIZES` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    Discrete(Resolution),
    Stepwise {
        min: Resolution,
        max: Resolution,
        step: Resolution,
    },
    Continuous {
        min: Resolution,
        max: Resolution,
    },
}

impl FrameSize {
    pub fn discrete(&self) -> Option<Resolution> {
        match self {
            FrameSize::Discrete(res) => Some(*res),
            _ => None,
        }
    }

    fn from_record(size: &V4l2Frmsizeenum) -> Result<Self> {
        match size.type_ {
            V4L2_FRMSIZE_TYPE_DISCRETE => {
                let d = size.discrete();
                Ok(FrameSize::Discrete(Resolution::new(d.width, d.height)))
            }
            V4L2_FRMSIZE_TYPE_STEPWISE | V4L2_FRMSIZE_TYPE_CONTINUOUS => {
                let s = size.stepwise();
                let min = Resolution::new(s.min_width, s.min_height);
                let max = Resolution::new(s.max_width, s.max_height);
                if size.type_ == V4L2_FRMSIZE_TYPE_CONTINUOUS {
                    Ok(FrameSize::Continuous { min, max })
                } else {
                    Ok(FrameSize::Stepwise {
                        min,
                        max,
                        step: Resolution::new(s.step_width, s.step_height),
                    })
                }
            }
            other => Err(Error::InvalidArgument(format!(
                "unknown frame size type {}",
                other
            ))),
        }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSize::Discrete(res) => write!(f, "{}", res),
            FrameSize::Stepwise { min, max, step } => {
                write!(f, "{} - {} step {}", min, max, step)
            }
            FrameSize::Continuous { min, max } => write!(f, "{} - {}", min, max),
        }
    }
}

/// One `VIDIOC_ENUM_FRAMEINTERVALS` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameInterval {
    Discrete(Fraction),
    Stepwise {
        min: Fraction,
        max: Fraction,
        step: Fraction,
    },
    Continuous {
        min: Fraction,
        max: Fraction,
    },
}

impl FrameInterval {
    pub fn discrete(&self) -> Option<Fraction> {
        match self {
            FrameInterval::Discrete(f) => Some(*f),
            _ => None,
        }
    }

    fn from_record(ival: &V4l2Frmivalenum) -> Result<Self> {
        match ival.type_ {
            V4L2_FRMIVAL_TYPE_DISCRETE => Ok(FrameInterval::Discrete(ival.discrete().into())),
            V4L2_FRMIVAL_TYPE_STEPWISE => {
                let s = ival.stepwise();
                Ok(FrameInterval::Stepwise {
                    min: s.min.into(),
                    max: s.max.into(),
                    step: s.step.into(),
                })
            }
            V4L2_FRMIVAL_TYPE_CONTINUOUS => {
                let s = ival.stepwise();
                Ok(FrameInterval::Continuous {
                    min: s.min.into(),
                    max: s.max.into(),
                })
            }
            other => Err(Error::InvalidArgument(format!(
                "unknown frame interval type {}",
                other
            ))),
        }
    }
}
