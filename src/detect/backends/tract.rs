#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectOptions, DetectorLoader, ObjectDetector};
use crate::detect::result::Prediction;
use crate::frame::VideoFrame;

type Plan = TypedRunnableModel<TypedModel>;

/// Tract-based SSD-style object detector.
///
/// Expects three outputs: boxes `[1, N, 4]` as normalized
/// `(ymin, xmin, ymax, xmax)`, class indices `[1, N]` and scores `[1, N]`.
/// Class indices map to lines of the labels file.
pub struct TractDetector {
    model: Plan,
    labels: Vec<String>,
    input_size: u32,
}

impl TractDetector {
    fn build_input(&self, frame: &VideoFrame) -> Result<Tensor> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;
        let size = self.input_size;
        let resized = imageops::resize(&image, size, size, imageops::FilterType::Triangle);
        let side = size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn label(&self, index: f32) -> String {
        let idx = index.max(0.0) as usize;
        self.labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", idx))
    }
}

impl ObjectDetector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &VideoFrame, options: &DetectOptions) -> Result<Vec<Prediction>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        if outputs.len() < 3 {
            return Err(anyhow!("expected 3 model outputs, got {}", outputs.len()));
        }

        let boxes = outputs[0]
            .to_array_view::<f32>()
            .context("box tensor was not f32")?;
        let classes = outputs[1]
            .to_array_view::<f32>()
            .context("class tensor was not f32")?;
        let scores = outputs[2]
            .to_array_view::<f32>()
            .context("score tensor was not f32")?;

        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let (fw, fh) = (frame.width as f32, frame.height as f32);
        let mut predictions: Vec<Prediction> = scores
            .iter()
            .zip(classes.iter())
            .zip(boxes.chunks_exact(4))
            .filter(|((score, _), _)| **score >= options.score_threshold)
            .map(|((score, class), b)| {
                let (ymin, xmin, ymax, xmax) = (b[0], b[1], b[2], b[3]);
                Prediction::new(
                    self.label(*class),
                    *score,
                    [xmin * fw, ymin * fh, (xmax - xmin) * fw, (ymax - ymin) * fh],
                )
            })
            .collect();
        predictions.truncate(options.max_detections);
        Ok(predictions)
    }
}

/// Loads an ONNX model and its labels file from disk.
pub struct TractLoader {
    model_path: PathBuf,
    labels_path: PathBuf,
    input_size: u32,
}

impl TractLoader {
    pub fn new<P: AsRef<Path>, L: AsRef<Path>>(model_path: P, labels_path: L, input_size: u32) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            labels_path: labels_path.as_ref().to_path_buf(),
            input_size,
        }
    }
}

impl DetectorLoader for TractLoader {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn load(&self) -> Result<Box<dyn ObjectDetector>> {
        let side = self.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(&self.model_path)
            .with_context(|| format!("failed to load ONNX model from {}", self.model_path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        let labels = std::fs::read_to_string(&self.labels_path)
            .with_context(|| format!("failed to read labels from {}", self.labels_path.display()))?
            .lines()
            .map(|l| l.trim().to_string())
            .collect();

        Ok(Box::new(TractDetector {
            model,
            labels,
            input_size: self.input_size,
        }))
    }
}
