//! Error taxonomy for the frame pipeline.
//!
//! Capability traits (devices, detectors, graphics backends) report failures as
//! `anyhow::Error`. The engine folds those into the typed errors below, which is
//! what the UI boundary sees.

use std::time::Duration;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures while acquiring the capture stream.
///
/// None of these are retried automatically; the user has to trigger `start` again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    DeviceNotFound,

    #[error("camera capture is not supported on this platform")]
    Unsupported,

    #[error("camera did not deliver a decodable frame within {0:?}")]
    Timeout(Duration),

    #[error("camera error: {0}")]
    Unknown(String),
}

impl CameraError {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Camera access was denied. Allow camera access and try again."
            }
            Self::DeviceNotFound => "No camera was found on this device.",
            Self::Unsupported => "Camera capture is not supported here.",
            Self::Timeout(_) => "The camera did not start in time. Try again.",
            Self::Unknown(_) => "Unknown camera error. Try again.",
        }
    }

    /// Classify an I/O error raised while opening a device node.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::NotFound => Self::DeviceNotFound,
            std::io::ErrorKind::Unsupported => Self::Unsupported,
            _ => Self::Unknown(err.to_string()),
        }
    }
}

/// Failures while producing a door asset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("unknown door model '{0}'")]
    UnknownStyle(String),

    #[error("failed to generate door model '{style}': {message}")]
    Generation { style: String, message: String },
}

impl AssetError {
    pub fn generation(style: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            style: style.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(CameraError),

    #[error("camera did not deliver a frame within {0:?}")]
    CameraTimeout(Duration),

    #[error("object detection unavailable: {0}")]
    DetectionUnavailable(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("render surface init failed: {0}")]
    RenderInit(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("engine is not running")]
    NotRunning,
}

impl EngineError {
    /// Fatal errors abort `start` and are shown as a blocking dialog.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CameraUnavailable(_) | Self::CameraTimeout(_) | Self::RenderInit(_)
        )
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::CameraUnavailable(err) => err.user_message().to_string(),
            Self::CameraTimeout(_) => CameraError::Timeout(Duration::ZERO)
                .user_message()
                .to_string(),
            Self::DetectionUnavailable(_) => {
                "Automatic doorway detection is unavailable.".to_string()
            }
            Self::Asset(_) => "Failed to load the door model.".to_string(),
            Self::RenderInit(_) => "3D rendering is not available on this device.".to_string(),
            Self::Screenshot(_) => "Failed to take a screenshot.".to_string(),
            Self::NotRunning => "The AR view is not running.".to_string(),
        }
    }
}

impl From<CameraError> for EngineError {
    fn from(err: CameraError) -> Self {
        match err {
            CameraError::Timeout(after) => Self::CameraTimeout(after),
            other => Self::CameraUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_failures_map_to_distinct_messages() {
        let kinds = [
            CameraError::PermissionDenied,
            CameraError::DeviceNotFound,
            CameraError::Unsupported,
            CameraError::Timeout(Duration::from_secs(5)),
            CameraError::Unknown("boom".into()),
        ];
        let mut messages: Vec<&str> = kinds.iter().map(|k| k.user_message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn camera_timeout_becomes_engine_timeout() {
        let err: EngineError = CameraError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, EngineError::CameraTimeout(d) if d == Duration::from_secs(5)));
        assert!(err.is_fatal());

        let err: EngineError = CameraError::PermissionDenied.into();
        assert!(matches!(
            err,
            EngineError::CameraUnavailable(CameraError::PermissionDenied)
        ));
    }

    #[test]
    fn degradations_are_not_fatal() {
        assert!(!EngineError::DetectionUnavailable("timeout".into()).is_fatal());
        assert!(!EngineError::Asset(AssetError::UnknownStyle("door_x".into())).is_fatal());
        assert!(!EngineError::Screenshot("not painted".into()).is_fatal());
    }

    #[test]
    fn io_errors_are_classified() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(CameraError::from_io(&denied), CameraError::PermissionDenied);
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(CameraError::from_io(&missing), CameraError::DeviceNotFound);
    }
}
