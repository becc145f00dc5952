use anyhow::Result;

use crate::detect::result::Prediction;
use crate::frame::VideoFrame;

/// Options forwarded to the external detector on each call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectOptions {
    pub max_detections: usize,
    pub score_threshold: f32,
}

/// Object detection capability.
///
/// # Audit Boundary
///
/// Implementations receive frame pixels by reference and MUST NOT:
/// - Keep the frame beyond the `detect` call
/// - Write pixels to disk or send them over the network
///
/// The raw predictions returned here are unfiltered; doorway filtering and
/// selection happen in `DetectionService`.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Labeled, scored, axis-aligned boxes in frame pixel space.
    fn detect(&mut self, frame: &VideoFrame, options: &DetectOptions) -> Result<Vec<Prediction>>;

    /// Free model resources. Called once on dispose.
    fn release(&mut self) {}
}

/// Loads a detector. Loading may be slow, so it runs off the calling thread
/// under a timeout; the loader therefore has to be shareable across threads.
pub trait DetectorLoader: Send + Sync {
    /// Name of the model this loader produces.
    fn name(&self) -> &'static str;

    fn load(&self) -> Result<Box<dyn ObjectDetector>>;
}
