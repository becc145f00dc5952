use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::CameraSettings;
use crate::error::CameraError;
use crate::frame::VideoFrame;

/// How often readiness is polled while waiting for the first frame.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which camera to prefer on devices with more than one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Requested stream parameters. Devices treat resolution as a hint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
}

impl From<&CameraSettings> for CaptureConstraints {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            facing: settings.facing,
        }
    }
}

/// Platform capture capability.
///
/// Implementations map platform failures onto `CameraError` in `open`; the
/// source above never retries on its own.
pub trait CaptureDevice: Send {
    /// Device identifier (for logs and stats).
    fn name(&self) -> &str;

    /// Acquire the capture stream.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), CameraError>;

    /// Returns true once the first frame of the opened stream is decodable.
    fn poll_ready(&mut self) -> Result<bool, CameraError>;

    /// Dimensions of the frames currently delivered.
    fn frame_size(&self) -> (u32, u32);

    /// Latest frame of the stream.
    fn read_frame(&mut self) -> anyhow::Result<VideoFrame>;

    /// Stop all tracks. Must tolerate being called on a released device.
    fn release(&mut self);
}

/// Owns the capture stream lifecycle and the frame counter used for sampling cadence.
pub struct CameraSource {
    device: Box<dyn CaptureDevice>,
    target: Option<String>,
    active: bool,
    frame_count: u64,
}

impl CameraSource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            target: None,
            active: false,
            frame_count: 0,
        }
    }

    /// Bind the display target the stream is shown on.
    pub fn init(&mut self, target: impl Into<String>) {
        let target = target.into();
        log::debug!("CameraSource: bound to {}", target);
        self.target = Some(target);
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Acquire the stream and wait for its first decodable frame.
    ///
    /// Waiting is bounded by `timeout`; on expiry the stream is released again
    /// and `CameraError::Timeout` is returned.
    pub fn request_access(
        &mut self,
        constraints: &CaptureConstraints,
        timeout: Duration,
    ) -> Result<(), CameraError> {
        if self.active {
            // At most one stream; a fresh request replaces the old one.
            self.stop();
        }

        log::info!(
            "CameraSource: requesting {} ({}x{}, {:?})",
            self.device.name(),
            constraints.width,
            constraints.height,
            constraints.facing
        );
        if let Err(err) = self.device.open(constraints) {
            log::error!("CameraSource: access failed: {}", err);
            self.device.release();
            return Err(err);
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.device.poll_ready() {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    log::error!("CameraSource: stream failed before first frame: {}", err);
                    self.device.release();
                    return Err(err);
                }
            }
            if Instant::now() >= deadline {
                log::error!("CameraSource: no frame within {:?}", timeout);
                self.device.release();
                return Err(CameraError::Timeout(timeout));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }

        self.active = true;
        let (width, height) = self.device.frame_size();
        log::info!("CameraSource: stream running at {}x{}", width, height);
        Ok(())
    }

    /// Release all tracks. No-op when idle.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.device.release();
        self.active = false;
        log::info!("CameraSource: stream stopped");
    }

    pub fn is_running(&self) -> bool {
        self.active
    }

    /// Count one rendered frame.
    pub fn advance_frame(&mut self) {
        self.frame_count += 1;
    }

    /// True exactly when the frame counter is a multiple of `interval`.
    pub fn should_sample_now(&self, interval: u32) -> bool {
        self.frame_count % u64::from(interval.max(1)) == 0
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn reset_frame_count(&mut self) {
        self.frame_count = 0;
    }

    /// Current frame dimensions, `(0, 0)` when idle.
    pub fn frame_size(&self) -> (u32, u32) {
        if self.active {
            self.device.frame_size()
        } else {
            (0, 0)
        }
    }

    /// Width over height, 0 when idle.
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.frame_size();
        if height == 0 {
            return 0.0;
        }
        width as f32 / height as f32
    }

    /// Resolution as `WxH`.
    pub fn resolution(&self) -> String {
        let (width, height) = self.frame_size();
        format!("{}x{}", width, height)
    }

    /// Latest frame, or `None` when idle.
    pub fn current_frame(&mut self) -> anyhow::Result<Option<VideoFrame>> {
        if !self.active {
            return Ok(None);
        }
        self.device.read_frame().map(Some)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SyntheticCamera;

    fn constraints() -> CaptureConstraints {
        CaptureConstraints {
            width: 64,
            height: 48,
            facing: FacingMode::Environment,
        }
    }

    #[test]
    fn sampling_cadence_hits_multiples_only() {
        let mut source = CameraSource::new(Box::new(SyntheticCamera::new("stub://cadence")));
        for interval in [1u32, 2, 3, 7] {
            source.reset_frame_count();
            for frame in 0..50u64 {
                assert_eq!(
                    source.should_sample_now(interval),
                    frame % u64::from(interval) == 0,
                    "interval {} frame {}",
                    interval,
                    frame
                );
                source.advance_frame();
            }
        }
    }

    #[test]
    fn access_starts_stream() {
        let mut source = CameraSource::new(Box::new(SyntheticCamera::new("stub://front")));
        source.init("video");
        source
            .request_access(&constraints(), Duration::from_secs(1))
            .expect("access");
        assert!(source.is_running());
        assert_eq!(source.resolution(), "64x48");
        let frame = source.current_frame().unwrap().expect("frame");
        assert_eq!((frame.width, frame.height), (64, 48));
    }

    #[test]
    fn slow_first_frame_times_out() {
        let camera =
            SyntheticCamera::new("stub://slow").with_startup_delay(Duration::from_secs(60));
        let mut source = CameraSource::new(Box::new(camera));
        let err = source
            .request_access(&constraints(), Duration::from_millis(30))
            .unwrap_err();
        assert_eq!(err, CameraError::Timeout(Duration::from_millis(30)));
        assert!(!source.is_running());
        assert_eq!(source.frame_size(), (0, 0));
    }

    #[test]
    fn open_failures_pass_through() {
        let camera = SyntheticCamera::new("stub://denied").failing(CameraError::PermissionDenied);
        let mut source = CameraSource::new(Box::new(camera));
        let err = source
            .request_access(&constraints(), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert!(!source.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut source = CameraSource::new(Box::new(SyntheticCamera::new("stub://twice")));
        source.stop();
        source
            .request_access(&constraints(), Duration::from_secs(1))
            .unwrap();
        source.stop();
        source.stop();
        assert!(!source.is_running());
        assert!(source.current_frame().unwrap().is_none());
    }
}
