use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::{DetectOptions, DetectorLoader, ObjectDetector};
use crate::detect::result::Prediction;
use crate::frame::VideoFrame;

/// Pixels darker than this luma count as doorway opening.
const DARK_LUMA: u32 = 80;
/// Sampling stride when scanning the frame.
const STRIDE: u32 = 2;

/// Lightweight stand-in for a learned detector.
///
/// Finds the bounding box of dark pixels (an open doorway against a lit wall)
/// and reports it as a `door` with a jittered score, plus an occasional
/// irrelevant distractor. Seeded, so runs are reproducible.
pub struct SimulatedDetector {
    rng: StdRng,
    distractor_rate: f64,
}

impl SimulatedDetector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            distractor_rate: 0.3,
        }
    }

    pub fn with_distractor_rate(mut self, rate: f64) -> Self {
        self.distractor_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn dark_bounds(frame: &VideoFrame) -> Option<[u32; 4]> {
        let mut bounds: Option<[u32; 4]> = None;
        for y in (0..frame.height).step_by(STRIDE as usize) {
            for x in (0..frame.width).step_by(STRIDE as usize) {
                let Some([r, g, b]) = frame.pixel(x, y) else {
                    continue;
                };
                let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
                if luma >= DARK_LUMA {
                    continue;
                }
                bounds = Some(match bounds {
                    None => [x, y, x, y],
                    Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
                });
            }
        }
        bounds
    }
}

impl ObjectDetector for SimulatedDetector {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn detect(&mut self, frame: &VideoFrame, options: &DetectOptions) -> Result<Vec<Prediction>> {
        let mut predictions = Vec::new();

        if let Some([x0, y0, x1, y1]) = Self::dark_bounds(frame) {
            let jitter = |rng: &mut StdRng| rng.gen_range(-2.0f32..=2.0);
            let x = x0 as f32 + jitter(&mut self.rng);
            let y = y0 as f32 + jitter(&mut self.rng);
            let w = (x1 - x0 + STRIDE) as f32 + jitter(&mut self.rng);
            let h = (y1 - y0 + STRIDE) as f32 + jitter(&mut self.rng);
            let score = self.rng.gen_range(0.7f32..0.95);
            predictions.push(Prediction::new("door", score, [x.max(0.0), y.max(0.0), w, h]));
        }

        if self.rng.gen_bool(self.distractor_rate) {
            let w = frame.width as f32 / 6.0;
            let h = frame.height as f32 / 5.0;
            let x = self.rng.gen_range(0.0..(frame.width as f32 - w).max(1.0));
            predictions.push(Prediction::new(
                "chair",
                self.rng.gen_range(0.5f32..0.9),
                [x, frame.height as f32 - h, w, h],
            ));
        }

        predictions.retain(|p| p.score >= options.score_threshold);
        predictions.truncate(options.max_detections);
        Ok(predictions)
    }
}

/// Loader for `SimulatedDetector`; each load gets a fresh seeded instance.
pub struct SimulatedLoader {
    seed: u64,
}

impl SimulatedLoader {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl DetectorLoader for SimulatedLoader {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn load(&self) -> Result<Box<dyn ObjectDetector>> {
        log::debug!("simulated detector seeded with {}", self.seed);
        Ok(Box::new(SimulatedDetector::new(self.seed)))
    }
}
