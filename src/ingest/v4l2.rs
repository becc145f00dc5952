//! V4L2 capture device.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates RGB3 or YUYV at
//! the requested resolution, and streams through memory-mapped buffers.
//! Frames are converted to RGB8 in memory and never written anywhere.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use super::camera::{CaptureConstraints, CaptureDevice};
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::error::CameraError;
use crate::frame::VideoFrame;

const STREAM_BUFFERS: u32 = 4;

pub struct V4l2Camera {
    path: String,
    state: Option<V4l2Stream>,
    format: PixelFormat,
    width: u32,
    height: u32,
    ready: bool,
    frames_captured: u64,
}

#[self_referencing]
struct V4l2Stream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: None,
            format: PixelFormat::Rgb24,
            width: 0,
            height: 0,
            ready: false,
            frames_captured: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    fn negotiate(&mut self, device: &mut v4l::Device, constraints: &CaptureConstraints) -> Result<()> {
        use v4l::video::Capture;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = constraints.width;
        format.height = constraints.height;
        format.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2Camera: failed to set format on {}: {}", self.path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        self.format = PixelFormat::from_fourcc(&format.fourcc.repr).with_context(|| {
            format!(
                "unsupported pixel format {} on {}",
                format.fourcc, self.path
            )
        })?;
        self.width = format.width;
        self.height = format.height;
        Ok(())
    }

    fn dequeue(&mut self) -> Result<VideoFrame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not open")?;
        let (width, height, format) = (self.width, self.height, self.format);
        let rgb = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, _meta) = fields.stream.next().context("capture v4l2 frame")?;
            normalize_to_rgb(buf, width, height, format)
        })?;
        self.frames_captured += 1;
        VideoFrame::from_rgb(rgb, width, height)
    }
}

impl CaptureDevice for V4l2Camera {
    fn name(&self) -> &str {
        &self.path
    }

    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), CameraError> {
        use v4l::buffer::Type;

        let mut device =
            v4l::Device::with_path(&self.path).map_err(|err| CameraError::from_io(&err))?;
        self.negotiate(&mut device, constraints)
            .map_err(|err| CameraError::Unknown(format!("{:#}", err)))?;

        let state = V4l2StreamTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
            },
        }
        .try_build()
        .map_err(|err| CameraError::from_io(&err))?;
        self.state = Some(state);
        self.ready = false;

        log::info!(
            "V4l2Camera: opened {} ({}x{}, {:?})",
            self.path,
            self.width,
            self.height,
            self.format
        );
        Ok(())
    }

    fn poll_ready(&mut self) -> Result<bool, CameraError> {
        if self.ready {
            return Ok(true);
        }
        // The first dequeued buffer proves the stream decodes.
        self.dequeue()
            .map_err(|err| CameraError::Unknown(format!("{:#}", err)))?;
        self.ready = true;
        Ok(true)
    }

    fn frame_size(&self) -> (u32, u32) {
        if self.state.is_some() {
            (self.width, self.height)
        } else {
            (0, 0)
        }
    }

    fn read_frame(&mut self) -> Result<VideoFrame> {
        self.dequeue()
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Camera: released {}", self.path);
        }
        self.ready = false;
    }
}
