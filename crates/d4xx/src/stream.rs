// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! Memory-mapped streaming capture
//!
//! A [`StreamSession`] drives one device handle through the V4L2 MMAP
//! streaming lifecycle:
//!
//! ```text
//! Idle -> Requested -> Mapped -> Queued -> Streaming
//!      -> { dequeue / requeue }*
//!      -> Stopped -> Unmapped -> Released
//! ```
//!
//! [`StreamSession::acquire`] runs every step up to `Streaming` before it
//! returns. Teardown runs on [`StreamSession::release`] and on drop, on every
//! exit path: stream-off first, then unmap, then release the buffer request.
//! Stream-off must come before unmapping because the driver keeps writing
//! into queued buffers until streaming stops.
//!
//! Several streams (depth, color, metadata) are captured together by
//! interleaving `dequeue`/`requeue` on independent sessions from one thread.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use d4xx::device::DeviceHandle;
//! use d4xx::records::BufferType;
//! use d4xx::stream::StreamSession;
//!
//! let dev = DeviceHandle::open("/dev/video0")?;
//! let mut session = StreamSession::acquire(&dev, BufferType::VideoCapture, 4)?;
//!
//! let desc = {
//!     let frame = session.dequeue(Duration::from_secs(1))?;
//!     println!("frame {} ({} bytes)", frame.descriptor.sequence, frame.data.len());
//!     frame.descriptor
//! };
//! session.requeue(&desc)?;
//! # Ok::<(), d4xx::Error>(())
//! ```

use std::io;
use std::os::fd::RawFd;
use std::ptr::{self, NonNull};
use std::slice;
use std::time::{Duration, Instant};

use bytemuck::Zeroable;
use log::{debug, trace, warn};

use crate::device::DeviceHandle;
use crate::ioctl;
use crate::records::{BufferType, V4l2Buffer, V4l2Requestbuffers, V4L2_MEMORY_MMAP};
use crate::{Error, Result};

/// Lifecycle position of a [`StreamSession`]. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Idle,
    Requested,
    Mapped,
    Queued,
    Streaming,
    Stopped,
    Unmapped,
    Released,
}

/// One buffer mapped into this process.
struct MappedBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedBuffer {
    fn map(fd: RawFd, length: u32, offset: u32) -> Result<Self> {
        let len = length as usize;
        if len == 0 {
            return Err(Error::Mmap(io::Error::new(
                io::ErrorKind::InvalidData,
                "driver reported a zero-length buffer",
            )));
        }
        // SAFETY: a fresh shared mapping at a kernel-chosen address; the
        // offset is the cookie the driver returned for this buffer.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(Error::Mmap(io::Error::last_os_error()));
        }
        let ptr = NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
            Error::Mmap(io::Error::new(io::ErrorKind::Other, "mmap returned null"))
        })?;
        Ok(MappedBuffer { ptr, len })
    }

    /// The first `used` bytes of the mapping.
    fn as_slice(&self, used: usize) -> &[u8] {
        // SAFETY: the mapping is live for the lifetime of `self` and
        // `used` is clamped to its length.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), used.min(self.len)) }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe a mapping created in `map` and not
        // unmapped anywhere else.
        let ret = unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len) };
        if ret != 0 {
            warn!("munmap failed: {}", io::Error::last_os_error());
        }
    }
}

/// Per-frame information returned by the driver on dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Buffer index within the session
    pub index: u32,
    /// Driver frame sequence number
    pub sequence: u32,
    /// Capture time on the monotonic clock
    pub timestamp: Duration,
    pub bytes_used: u32,
    pub flags: u32,
    pub field: u32,
}

impl FrameDescriptor {
    fn from_record(buf: &V4l2Buffer) -> Self {
        let secs = u64::try_from(buf.timestamp.tv_sec).unwrap_or(0);
        let micros = u32::try_from(buf.timestamp.tv_usec).unwrap_or(0);
        FrameDescriptor {
            index: buf.index,
            sequence: buf.sequence,
            timestamp: Duration::from_secs(secs) + Duration::from_micros(micros.into()),
            bytes_used: buf.bytesused,
            flags: buf.flags,
            field: buf.field,
        }
    }
}

/// A dequeued frame: its descriptor and a read-only view of the buffer,
/// `bytes_used` long. The buffer stays out of rotation until requeued.
#[derive(Debug)]
pub struct Frame<'s> {
    pub descriptor: FrameDescriptor,
    pub data: &'s [u8],
}

/// A frame copied out of its buffer by [`StreamSession::capture_frames`].
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub descriptor: FrameDescriptor,
    pub data: Vec<u8>,
}

/// MMAP streaming session over one device handle.
pub struct StreamSession<'a> {
    device: &'a DeviceHandle,
    buf_type: BufferType,
    buffers: Vec<MappedBuffer>,
    queued: Vec<bool>,
    state: SessionState,
    last_sequence: Option<u32>,
}

impl<'a> StreamSession<'a> {
    /// Requests `count` buffers, maps and queues all of them, and starts
    /// streaming.
    ///
    /// The driver may grant fewer buffers than requested; the granted count
    /// is used from then on. On failure everything acquired so far is torn
    /// down before the error is returned.
    pub fn acquire(device: &'a DeviceHandle, buf_type: BufferType, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidArgument(
                "buffer count must be non-zero".into(),
            ));
        }
        let mut session = StreamSession {
            device,
            buf_type,
            buffers: Vec::new(),
            queued: Vec::new(),
            state: SessionState::Idle,
            last_sequence: None,
        };
        session.request_buffers(count)?;
        session.map_buffers()?;
        session.queue_all()?;
        session.stream_on()?;
        debug!(
            "{}: streaming {:?} with {} buffers",
            device.path().display(),
            buf_type,
            session.buffers.len()
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn buffer_type(&self) -> BufferType {
        self.buf_type
    }

    /// Number of buffers granted by the driver.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn device(&self) -> &DeviceHandle {
        self.device
    }

    fn request_buffers(&mut self, count: u32) -> Result<()> {
        let mut req = V4l2Requestbuffers::zeroed();
        req.count = count;
        req.type_ = self.buf_type.as_raw();
        req.memory = V4L2_MEMORY_MMAP;
        self.device.ioctl(ioctl::VIDIOC_REQBUFS, &mut req)?;
        self.state = SessionState::Requested;
        if req.count == 0 {
            return Err(Error::NoBuffers);
        }
        if req.count != count {
            debug!(
                "{}: requested {} buffers, driver granted {}",
                self.device.path().display(),
                count,
                req.count
            );
        }
        self.buffers.reserve_exact(req.count as usize);
        self.queued = vec![false; req.count as usize];
        Ok(())
    }

    fn map_buffers(&mut self) -> Result<()> {
        let fd = self.device.raw_fd()?;
        for index in 0..self.queued.len() as u32 {
            let mut buf = V4l2Buffer::new(self.buf_type.as_raw(), V4L2_MEMORY_MMAP, index);
            self.device.ioctl(ioctl::VIDIOC_QUERYBUF, &mut buf)?;
            let mapped = MappedBuffer::map(fd, buf.length, buf.offset())?;
            trace!("buffer {} mapped ({} bytes)", index, mapped.len);
            self.buffers.push(mapped);
        }
        self.state = SessionState::Mapped;
        Ok(())
    }

    fn queue_all(&mut self) -> Result<()> {
        for index in 0..self.buffers.len() as u32 {
            self.queue(index)?;
        }
        self.state = SessionState::Queued;
        Ok(())
    }

    fn queue(&mut self, index: u32) -> Result<()> {
        let mut buf = V4l2Buffer::new(self.buf_type.as_raw(), V4L2_MEMORY_MMAP, index);
        self.device.ioctl(ioctl::VIDIOC_QBUF, &mut buf)?;
        self.queued[index as usize] = true;
        Ok(())
    }

    fn stream_on(&mut self) -> Result<()> {
        let mut buf_type = self.buf_type.as_raw() as libc::c_int;
        self.device.ioctl(ioctl::VIDIOC_STREAMON, &mut buf_type)?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Waits up to `timeout` for a filled buffer and dequeues it.
    ///
    /// Returns [`Error::Timeout`] when nothing arrives in time. The session
    /// stays usable after a timeout.
    pub fn dequeue(&mut self, timeout: Duration) -> Result<Frame<'_>> {
        self.ensure_streaming()?;
        self.wait_readable(timeout)?;

        let mut buf = V4l2Buffer::new(self.buf_type.as_raw(), V4L2_MEMORY_MMAP, 0);
        self.device.ioctl(ioctl::VIDIOC_DQBUF, &mut buf)?;

        let index = buf.index as usize;
        if index >= self.buffers.len() {
            return Err(Error::InvalidBuffer(buf.index));
        }
        self.queued[index] = false;

        let descriptor = FrameDescriptor::from_record(&buf);
        if let Some(last) = self.last_sequence {
            if descriptor.sequence <= last {
                warn!(
                    "{}: sequence went from {} to {}",
                    self.device.path().display(),
                    last,
                    descriptor.sequence
                );
            }
        }
        self.last_sequence = Some(descriptor.sequence);

        Ok(Frame {
            descriptor,
            data: self.buffers[index].as_slice(descriptor.bytes_used as usize),
        })
    }

    /// Hands a dequeued buffer back to the driver.
    pub fn requeue(&mut self, descriptor: &FrameDescriptor) -> Result<()> {
        self.ensure_streaming()?;
        let index = descriptor.index as usize;
        match self.queued.get(index) {
            None => Err(Error::InvalidBuffer(descriptor.index)),
            Some(true) => Err(Error::InvalidArgument(format!(
                "buffer {} is already queued",
                descriptor.index
            ))),
            Some(false) => self.queue(descriptor.index),
        }
    }

    /// Dequeues and requeues `count` frames, copying each out.
    ///
    /// A timeout on any frame fails the whole capture.
    pub fn capture_frames(&mut self, count: usize, timeout: Duration) -> Result<Vec<CapturedFrame>> {
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let captured = {
                let frame = self.dequeue(timeout)?;
                CapturedFrame {
                    descriptor: frame.descriptor,
                    data: frame.data.to_vec(),
                }
            };
            self.requeue(&captured.descriptor)?;
            frames.push(captured);
        }
        Ok(frames)
    }

    /// Stops streaming and releases every buffer.
    pub fn release(mut self) {
        self.teardown();
    }

    fn ensure_streaming(&self) -> Result<()> {
        if self.state == SessionState::Streaming {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "session is {:?}, not streaming",
                self.state
            )))
        }
    }

    fn wait_readable(&self, timeout: Duration) -> Result<()> {
        let fd = self.device.raw_fd()?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: one valid pollfd
            let ret = unsafe { libc::poll(&mut pfd, 1, millis) };
            match ret {
                0 => return Err(Error::Timeout(timeout)),
                n if n > 0 => return Ok(()),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(Error::Ioctl("poll", err));
                    }
                }
            }
        }
    }

    /// Best-effort teardown from whatever state the session reached.
    fn teardown(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        let reached = self.state;
        let path = self.device.path().display().to_string();

        if reached >= SessionState::Queued && reached <= SessionState::Streaming {
            let mut buf_type = self.buf_type.as_raw() as libc::c_int;
            if let Err(err) = self.device.ioctl(ioctl::VIDIOC_STREAMOFF, &mut buf_type) {
                warn!("{}: stream off failed: {}", path, err);
            }
            self.queued.iter_mut().for_each(|q| *q = false);
            self.state = SessionState::Stopped;
        }

        self.buffers.clear();
        self.state = SessionState::Unmapped;

        if reached >= SessionState::Requested {
            let mut req = V4l2Requestbuffers::zeroed();
            req.type_ = self.buf_type.as_raw();
            req.memory = V4L2_MEMORY_MMAP;
            if let Err(err) = self.device.ioctl(ioctl::VIDIOC_REQBUFS, &mut req) {
                warn!("{}: releasing buffers failed: {}", path, err);
            }
        }
        self.queued.clear();
        self.state = SessionState::Released;
        debug!("{}: stream session released", path);
    }
}

impl Drop for StreamSession<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Gap analysis of a run of sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceReport {
    pub frames: usize,
    /// Every sequence number was greater than the one before it
    pub monotonic: bool,
    /// Largest step between consecutive sequence numbers
    pub max_gap: u32,
    /// Sequence numbers skipped between captured frames
    pub dropped: u64,
}

impl SequenceReport {
    pub fn from_sequences(sequences: impl IntoIterator<Item = u32>) -> Self {
        let mut report = SequenceReport {
            monotonic: true,
            ..Default::default()
        };
        let mut last: Option<u32> = None;
        for seq in sequences {
            report.frames += 1;
            if let Some(prev) = last {
                if seq <= prev {
                    report.monotonic = false;
                } else {
                    let gap = seq - prev;
                    report.max_gap = report.max_gap.max(gap);
                    report.dropped += u64::from(gap - 1);
                }
            }
            last = Some(seq);
        }
        report
    }

    pub fn from_descriptors<'d>(frames: impl IntoIterator<Item = &'d FrameDescriptor>) -> Self {
        Self::from_sequences(frames.into_iter().map(|f| f.sequence))
    }

    /// Strictly increasing by exactly one.
    pub fn is_contiguous(&self) -> bool {
        self.monotonic && self.dropped == 0
    }
}

/// Frame rate measured from the first and last timestamps.
///
/// `None` with fewer than two frames or a zero time span.
pub fn measured_fps(frames: &[FrameDescriptor]) -> Option<f64> {
    let (first, last) = (frames.first()?, frames.last()?);
    let span = last.timestamp.checked_sub(first.timestamp)?;
    if frames.len() < 2 || span.is_zero() {
        return None;
    }
    Some((frames.len() - 1) as f64 / span.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::fd::AsRawFd;

    fn descriptor(sequence: u32, millis: u64) -> FrameDescriptor {
        FrameDescriptor {
            index: sequence % 4,
            sequence,
            timestamp: Duration::from_millis(millis),
            bytes_used: 0,
            flags: 0,
            field: 0,
        }
    }

    #[test]
    fn test_state_order() {
        assert!(SessionState::Idle < SessionState::Requested);
        assert!(SessionState::Queued < SessionState::Streaming);
        assert!(SessionState::Streaming < SessionState::Stopped);
        assert!(SessionState::Unmapped < SessionState::Released);
    }

    #[test]
    fn test_acquire_rejects_zero_buffers() {
        let dev = DeviceHandle::open("/dev/null").unwrap();
        assert!(matches!(
            StreamSession::acquire(&dev, BufferType::VideoCapture, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_acquire_failure_is_clean() {
        let dev = DeviceHandle::open("/dev/null").unwrap();
        match StreamSession::acquire(&dev, BufferType::VideoCapture, 4) {
            Err(Error::Ioctl(name, err)) => {
                assert_eq!(name, "VIDIOC_REQBUFS");
                assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
            }
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("/dev/null accepted a buffer request"),
        }
        // the handle is still usable afterwards
        assert!(dev.is_open());
    }

    #[test]
    fn test_mapped_buffer_view() {
        let path = std::env::temp_dir().join(format!(
            "d4xx-mmap-{}",
            rand::rng().random::<u32>()
        ));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        let mut payload = vec![0u8; 4096];
        rand::rng().fill(&mut payload[..]);
        file.write_all(&payload).unwrap();
        file.flush().unwrap();

        {
            let mapped = MappedBuffer::map(file.as_raw_fd(), 4096, 0).unwrap();
            assert_eq!(mapped.as_slice(100), &payload[..100]);
            assert_eq!(mapped.as_slice(10_000).len(), 4096);
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_zero_length_mapping_is_rejected() {
        let file = std::fs::File::open("/dev/null").unwrap();
        assert!(matches!(
            MappedBuffer::map(file.as_raw_fd(), 0, 0),
            Err(Error::Mmap(_))
        ));
    }

    #[test]
    fn test_sequence_report_contiguous() {
        let report = SequenceReport::from_sequences(10..40);
        assert_eq!(report.frames, 30);
        assert!(report.monotonic);
        assert_eq!(report.max_gap, 1);
        assert_eq!(report.dropped, 0);
        assert!(report.is_contiguous());
    }

    #[test]
    fn test_sequence_report_with_drops() {
        let report = SequenceReport::from_sequences([0, 1, 2, 5, 6, 10]);
        assert!(report.monotonic);
        assert_eq!(report.max_gap, 4);
        assert_eq!(report.dropped, 5);
        assert!(!report.is_contiguous());
    }

    #[test]
    fn test_sequence_report_non_monotonic() {
        let report = SequenceReport::from_sequences([3, 4, 4, 2]);
        assert!(!report.monotonic);
        assert!(!report.is_contiguous());
    }

    #[test]
    fn test_sequence_report_from_descriptors() {
        let frames: Vec<_> = (0..5).map(|s| descriptor(s, s as u64 * 33)).collect();
        assert!(SequenceReport::from_descriptors(&frames).is_contiguous());
    }

    #[test]
    fn test_measured_fps() {
        let frames: Vec<_> = (0..31).map(|s| descriptor(s, s as u64 * 1000 / 30)).collect();
        let fps = measured_fps(&frames).unwrap();
        assert!((fps - 30.0).abs() < 0.1, "fps {}", fps);

        assert_eq!(measured_fps(&frames[..1]), None);
        assert_eq!(measured_fps(&[]), None);
        assert_eq!(measured_fps(&[descriptor(0, 5), descriptor(1, 5)]), None);
    }
}
