use std::collections::VecDeque;

use crate::detect::result::Detection;

/// Aggregate statistics over the retained history.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionStats {
    pub total_detections: usize,
    pub average_score: f32,
    pub max_score: f32,
    pub min_score: f32,
    /// Fraction of retained frames that produced at least one candidate.
    pub detection_rate: f32,
}

/// Bounded FIFO of per-frame candidate lists. Statistics only; never used for smoothing.
#[derive(Debug)]
pub struct DetectionHistory {
    frames: VecDeque<Vec<Detection>>,
    capacity: usize,
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, candidates: Vec<Detection>) {
        while self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(candidates);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// `None` when nothing was recorded or no frame had a candidate.
    pub fn stats(&self) -> Option<DetectionStats> {
        let scores: Vec<f32> = self.frames.iter().flatten().map(|d| d.score).collect();
        if scores.is_empty() {
            return None;
        }
        let sum: f32 = scores.iter().sum();
        let with_candidates = self.frames.iter().filter(|f| !f.is_empty()).count();
        Some(DetectionStats {
            total_detections: scores.len(),
            average_score: sum / scores.len() as f32,
            max_score: scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            min_score: scores.iter().copied().fold(f32::INFINITY, f32::min),
            detection_rate: with_candidates as f32 / self.frames.len() as f32,
        })
    }
}
