//! Camera capture.
//!
//! This module provides the capture side of the pipeline:
//! - `CaptureDevice`: the platform capability (open, first-frame readiness, read, release)
//! - `CameraSource`: stream lifecycle and the per-frame sampling cadence
//! - `SyntheticCamera`: `stub://` devices for tests and headless runs
//! - `V4l2Camera`: local V4L2 devices (feature: ingest-v4l2)
//!
//! The capture layer MUST NOT:
//! - Store frames to disk
//! - Log frame content
//! - Hold more than one active stream

mod camera;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use camera::{CameraSource, CaptureConstraints, CaptureDevice, FacingMode};
pub use synthetic::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Camera;

use anyhow::Result;

/// Build the capture device named by `device`.
///
/// `stub://` names map to a synthetic camera; anything else needs a platform
/// backend and reports `CameraError::Unsupported` when none is compiled in.
pub fn open_device(device: &str) -> Result<Box<dyn CaptureDevice>> {
    if device.starts_with("stub://") {
        return Ok(Box::new(SyntheticCamera::new(device)));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Camera::new(device)))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        log::warn!("camera device '{}' requires the ingest-v4l2 feature", device);
        Err(crate::error::CameraError::Unsupported.into())
    }
}
