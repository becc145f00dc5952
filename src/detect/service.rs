use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::DetectionSettings;
use crate::detect::backend::{DetectOptions, DetectorLoader, ObjectDetector};
use crate::detect::filter::DoorwayFilter;
use crate::detect::history::{DetectionHistory, DetectionStats};
use crate::detect::result::Detection;
use crate::detect::smoothing::DetectionSmoother;
use crate::error::{EngineError, EngineResult};
use crate::frame::VideoFrame;

/// Lifecycle of the detection service.
///
/// `Unavailable` is terminal for the session: a failed or timed-out load is
/// never retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Ready,
    Unavailable,
    Disposed,
}

/// Snapshot for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorInfo {
    pub loaded: bool,
    pub model: Option<&'static str>,
    pub history_len: usize,
    pub smoothing_len: usize,
}

/// Wraps an external object detector and turns raw predictions into at most
/// one doorway candidate per sampled frame.
pub struct DetectionService {
    detector: Option<Box<dyn ObjectDetector>>,
    model_name: Option<&'static str>,
    state: ServiceState,
    filter: DoorwayFilter,
    options: DetectOptions,
    load_timeout: Duration,
    smoothing: bool,
    history: DetectionHistory,
    smoother: DetectionSmoother,
}

impl DetectionService {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            detector: None,
            model_name: None,
            state: ServiceState::Uninitialized,
            filter: DoorwayFilter::new(settings),
            options: DetectOptions {
                max_detections: settings.max_detections,
                score_threshold: settings.min_confidence,
            },
            load_timeout: settings.load_timeout,
            smoothing: settings.smoothing,
            history: DetectionHistory::new(settings.history_len),
            smoother: DetectionSmoother::new(settings.smoothing_factors, settings.smoothing_window),
        }
    }

    /// Load the detector on a worker thread and wait at most `load_timeout`.
    ///
    /// Calling again after success is a no-op. After any failure the service
    /// stays unavailable and every later call reports the same error.
    pub fn init(&mut self, loader: Arc<dyn DetectorLoader>) -> EngineResult<()> {
        match self.state {
            ServiceState::Ready => return Ok(()),
            ServiceState::Unavailable => {
                return Err(EngineError::DetectionUnavailable(
                    "detector failed to load earlier in this session".to_string(),
                ))
            }
            ServiceState::Disposed => {
                return Err(EngineError::DetectionUnavailable(
                    "detection service was disposed".to_string(),
                ))
            }
            ServiceState::Uninitialized => {}
        }

        let model = loader.name();
        log::info!("loading detector model {} (timeout {:?})", model, self.load_timeout);

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&loader);
        let spawned = thread::Builder::new()
            .name("detector-load".to_string())
            .spawn(move || {
                // Receiver may already be gone after a timeout.
                let _ = tx.send(worker.load());
            });
        if let Err(e) = spawned {
            return self.fail(format!("failed to spawn loader thread: {}", e));
        }

        match rx.recv_timeout(self.load_timeout) {
            Ok(Ok(detector)) => {
                self.detector = Some(detector);
                self.model_name = Some(model);
                self.state = ServiceState::Ready;
                log::info!("detector model {} ready", model);
                Ok(())
            }
            Ok(Err(e)) => self.fail(format!("model {} failed to load: {:#}", model, e)),
            Err(RecvTimeoutError::Timeout) => self.fail(format!(
                "model {} did not load within {:?}",
                model, self.load_timeout
            )),
            Err(RecvTimeoutError::Disconnected) => {
                self.fail(format!("model {} loader exited without a result", model))
            }
        }
    }

    fn fail(&mut self, reason: String) -> EngineResult<()> {
        log::warn!("object detection unavailable: {}", reason);
        self.state = ServiceState::Unavailable;
        Err(EngineError::DetectionUnavailable(reason))
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ServiceState::Ready && self.detector.is_some()
    }

    /// Best doorway candidate in `frame`, or `None`.
    ///
    /// Detector errors are logged and treated as "nothing found". Every
    /// successful call records its filtered candidates in the history.
    pub fn detect(&mut self, frame: &VideoFrame) -> Option<Detection> {
        if !self.is_ready() {
            return None;
        }
        let detector = self.detector.as_mut()?;
        let predictions = match detector.detect(frame, &self.options) {
            Ok(predictions) => predictions,
            Err(e) => {
                log::warn!("detector {} failed on frame: {:#}", detector.name(), e);
                return None;
            }
        };

        let candidates = self.filter.filter(&predictions);
        log::debug!(
            "{} predictions, {} doorway candidates",
            predictions.len(),
            candidates.len()
        );
        let best = DoorwayFilter::select_best(&candidates).cloned();
        self.history.push(candidates);

        match best {
            Some(det) if self.smoothing => Some(self.smoother.smooth(&det)),
            other => other,
        }
    }

    /// Blend `current` with the previously smoothed detection.
    pub fn smooth_detection(&mut self, current: &Detection) -> Detection {
        self.smoother.smooth(current)
    }

    pub fn stats(&self) -> Option<DetectionStats> {
        self.history.stats()
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
        self.smoother.reset();
    }

    pub fn model_info(&self) -> DetectorInfo {
        DetectorInfo {
            loaded: self.is_ready(),
            model: self.model_name,
            history_len: self.history.len(),
            smoothing_len: self.smoother.len(),
        }
    }

    /// Release the detector and drop all history. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            log::debug!("releasing detector {}", detector.name());
            detector.release();
        }
        self.reset_history();
        self.state = ServiceState::Disposed;
    }
}

impl Drop for DetectionService {
    fn drop(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            detector.release();
        }
    }
}
