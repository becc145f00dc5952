use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectOptions, DetectorLoader, ObjectDetector};
use crate::detect::result::Prediction;
use crate::frame::VideoFrame;

/// Replays a fixed queue of prediction lists, one per call.
///
/// Once the queue is drained every call returns an empty list. Used in
/// tests and for deterministic demo runs.
pub struct ScriptedDetector {
    script: VecDeque<Vec<Prediction>>,
    calls: usize,
    fail_after: Option<usize>,
    released: Arc<AtomicBool>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Prediction>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
            fail_after: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Return an error from call number `n` (zero-based) onwards.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Flag set once `release` runs.
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &VideoFrame, options: &DetectOptions) -> Result<Vec<Prediction>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_after.is_some_and(|n| call >= n) {
            return Err(anyhow!("scripted failure on call {}", call));
        }
        let mut predictions = self.script.pop_front().unwrap_or_default();
        predictions.truncate(options.max_detections);
        Ok(predictions)
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Hands out a single pre-built detector, optionally after a delay or not at all.
pub struct ScriptedLoader {
    detector: Mutex<Option<Box<dyn ObjectDetector>>>,
    failure: Option<String>,
    delay: Duration,
}

impl ScriptedLoader {
    pub fn ready<D: ObjectDetector + 'static>(detector: D) -> Self {
        Self {
            detector: Mutex::new(Some(Box::new(detector))),
            failure: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            detector: Mutex::new(None),
            failure: Some(reason.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl DetectorLoader for ScriptedLoader {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&self) -> Result<Box<dyn ObjectDetector>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(reason) = &self.failure {
            return Err(anyhow!("{}", reason));
        }
        self.detector
            .lock()
            .map_err(|_| anyhow!("scripted loader lock poisoned"))?
            .take()
            .ok_or_else(|| anyhow!("scripted detector already handed out"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_then_runs_dry() {
        let frame = VideoFrame::from_rgb(vec![0u8; 12], 2, 2).unwrap();
        let options = DetectOptions {
            max_detections: 1,
            score_threshold: 0.5,
        };
        let mut detector = ScriptedDetector::new(vec![vec![
            Prediction::new("door", 0.9, [0.0, 0.0, 10.0, 20.0]),
            Prediction::new("cup", 0.7, [0.0, 0.0, 10.0, 20.0]),
        ]]);
        assert_eq!(detector.detect(&frame, &options).unwrap().len(), 1);
        assert!(detector.detect(&frame, &options).unwrap().is_empty());
    }

    #[test]
    fn loader_hands_out_once() {
        let loader = ScriptedLoader::ready(ScriptedDetector::new(Vec::new()));
        assert!(loader.load().is_ok());
        assert!(loader.load().is_err());
    }
}
