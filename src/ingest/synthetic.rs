//! Synthetic camera for `stub://` devices.
//!
//! Produces a textured wall with a darker doorway that slowly drifts left and
//! right, so the whole pipeline can run without capture hardware.

use anyhow::Result;
use std::time::{Duration, Instant};

use super::camera::{CaptureConstraints, CaptureDevice};
use crate::error::CameraError;
use crate::frame::VideoFrame;

pub struct SyntheticCamera {
    name: String,
    width: u32,
    height: u32,
    opened_at: Option<Instant>,
    startup_delay: Duration,
    open_error: Option<CameraError>,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: 0,
            height: 0,
            opened_at: None,
            startup_delay: Duration::ZERO,
            open_error: None,
            frame_count: 0,
        }
    }

    /// Delay between `open` and the first decodable frame.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Make every `open` fail with `error`.
    pub fn failing(mut self, error: CameraError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    /// Pixel-space doorway rectangle `(x, y, w, h)` drawn into frame `n`.
    pub fn doorway_rect(&self, n: u64) -> (u32, u32, u32, u32) {
        let door_w = self.width / 4;
        let door_h = self.height * 3 / 5;
        let travel = self.width.saturating_sub(door_w) / 2;
        let phase = (n % 240) as f32 / 240.0 * std::f32::consts::TAU;
        let center = self.width as f32 / 2.0 + phase.sin() * travel as f32 * 0.5;
        let x = (center - door_w as f32 / 2.0).max(0.0) as u32;
        let y = self.height.saturating_sub(door_h + self.height / 10);
        (x, y, door_w, door_h)
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let (dx, dy, dw, dh) = self.doorway_rect(self.frame_count);
        let mut pixels = vec![0u8; self.width as usize * self.height as usize * 3];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let x = (i % self.width as usize) as u32;
            let y = (i / self.width as usize) as u32;
            let inside = x >= dx && x < dx + dw && y >= dy && y < dy + dh;
            if inside {
                px.copy_from_slice(&[40, 30, 25]);
            } else {
                let shade = 160 + ((u64::from(x / 8 + y / 8) + self.frame_count) % 32) as u8;
                px.copy_from_slice(&[shade, shade - 10, shade - 25]);
            }
        }
        pixels
    }
}

impl CaptureDevice for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), CameraError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        self.width = constraints.width;
        self.height = constraints.height;
        self.opened_at = Some(Instant::now());
        log::info!("SyntheticCamera: opened {} (synthetic)", self.name);
        Ok(())
    }

    fn poll_ready(&mut self) -> Result<bool, CameraError> {
        match self.opened_at {
            Some(opened) => Ok(opened.elapsed() >= self.startup_delay),
            None => Err(CameraError::Unknown(format!("{} is not open", self.name))),
        }
    }

    fn frame_size(&self) -> (u32, u32) {
        if self.opened_at.is_some() {
            (self.width, self.height)
        } else {
            (0, 0)
        }
    }

    fn read_frame(&mut self) -> Result<VideoFrame> {
        if self.opened_at.is_none() {
            anyhow::bail!("{} is not open", self.name);
        }
        self.frame_count += 1;
        VideoFrame::from_rgb(self.generate_pixels(), self.width, self.height)
    }

    fn release(&mut self) {
        self.opened_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FacingMode;

    fn open(camera: &mut SyntheticCamera) {
        camera
            .open(&CaptureConstraints {
                width: 80,
                height: 60,
                facing: FacingMode::User,
            })
            .unwrap();
    }

    #[test]
    fn frames_contain_a_dark_doorway() -> Result<()> {
        let mut camera = SyntheticCamera::new("stub://door");
        open(&mut camera);
        let frame = camera.read_frame()?;
        let (x, y, w, h) = camera.doorway_rect(camera.frames_captured());
        let inside = frame.pixel(x + w / 2, y + h / 2).unwrap();
        let outside = frame.pixel(0, 0).unwrap();
        assert!(inside[0] < outside[0]);
        Ok(())
    }

    #[test]
    fn released_camera_refuses_reads() {
        let mut camera = SyntheticCamera::new("stub://closed");
        open(&mut camera);
        camera.release();
        camera.release();
        assert!(camera.read_frame().is_err());
        assert_eq!(camera.frame_size(), (0, 0));
    }
}
