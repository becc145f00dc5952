use std::collections::VecDeque;

use crate::detect::result::{BoundingBox, Detection, Point};

/// Blend factors toward the newest detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingFactors {
    pub position: f32,
    pub size: f32,
    pub center: f32,
}

impl Default for SmoothingFactors {
    fn default() -> Self {
        Self {
            position: 0.3,
            size: 0.2,
            center: 0.3,
        }
    }
}

/// Exponential frame-to-frame smoothing of detection boxes.
///
/// Each new detection is blended against the most recently emitted one. The
/// first detection after a reset passes through unchanged.
#[derive(Debug)]
pub struct DetectionSmoother {
    factors: SmoothingFactors,
    window: usize,
    recent: VecDeque<Detection>,
}

impl DetectionSmoother {
    pub fn new(factors: SmoothingFactors, window: usize) -> Self {
        Self {
            factors,
            window: window.max(1),
            recent: VecDeque::with_capacity(window.max(1)),
        }
    }

    pub fn smooth(&mut self, current: &Detection) -> Detection {
        let smoothed = match self.recent.back() {
            None => current.clone(),
            Some(last) => {
                let f = self.factors;
                let bbox = BoundingBox {
                    x: lerp(last.bbox.x, current.bbox.x, f.position),
                    y: lerp(last.bbox.y, current.bbox.y, f.position),
                    width: lerp(last.bbox.width, current.bbox.width, f.size),
                    height: lerp(last.bbox.height, current.bbox.height, f.size),
                };
                Detection {
                    aspect_ratio: bbox.height / bbox.width,
                    bbox,
                    center: Point {
                        x: lerp(last.center.x, current.center.x, f.center),
                        y: lerp(last.center.y, current.center.y, f.center),
                    },
                    ..current.clone()
                }
            }
        };

        if self.recent.len() >= self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(smoothed.clone());
        smoothed
    }

    pub fn last(&self) -> Option<&Detection> {
        self.recent.back()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(
            "door",
            0.8,
            BoundingBox {
                x,
                y,
                width: w,
                height: h,
            },
        )
    }

    #[test]
    fn first_detection_passes_through() {
        let mut smoother = DetectionSmoother::new(SmoothingFactors::default(), 3);
        let d = det(10.0, 20.0, 100.0, 200.0);
        assert_eq!(smoother.smooth(&d), d);
    }

    #[test]
    fn blends_with_configured_factors() {
        let mut smoother = DetectionSmoother::new(SmoothingFactors::default(), 3);
        smoother.smooth(&det(0.0, 0.0, 100.0, 200.0));
        let out = smoother.smooth(&det(100.0, 100.0, 200.0, 300.0));
        assert!((out.bbox.x - 30.0).abs() < 1e-4);
        assert!((out.bbox.y - 30.0).abs() < 1e-4);
        assert!((out.bbox.width - 120.0).abs() < 1e-4);
        assert!((out.bbox.height - 220.0).abs() < 1e-4);
        // Centers blend at 0.3: (50,100) -> (200,250)
        assert!((out.center.x - 95.0).abs() < 1e-4);
        assert!((out.center.y - 145.0).abs() < 1e-4);
        assert!((out.aspect_ratio - 220.0 / 120.0).abs() < 1e-4);
    }

    #[test]
    fn constant_stream_converges_without_overshoot() {
        let mut smoother = DetectionSmoother::new(SmoothingFactors::default(), 3);
        smoother.smooth(&det(0.0, 0.0, 60.0, 120.0));
        let target = det(300.0, 150.0, 180.0, 400.0);
        let mut prev = smoother.last().cloned().unwrap();
        for _ in 0..200 {
            let out = smoother.smooth(&target);
            assert!(out.bbox.x <= target.bbox.x && out.bbox.x >= prev.bbox.x);
            assert!(out.bbox.y <= target.bbox.y && out.bbox.y >= prev.bbox.y);
            assert!(out.bbox.width <= target.bbox.width);
            assert!(out.bbox.height <= target.bbox.height);
            assert!(out.center.x <= target.center.x);
            assert!(out.center.y <= target.center.y);
            prev = out;
        }
        assert!((prev.bbox.x - target.bbox.x).abs() < 1e-2);
        assert!((prev.bbox.width - target.bbox.width).abs() < 1e-2);
        assert!((prev.center.y - target.center.y).abs() < 1e-2);
    }

    #[test]
    fn history_is_capped() {
        let mut smoother = DetectionSmoother::new(SmoothingFactors::default(), 3);
        for i in 0..10 {
            smoother.smooth(&det(i as f32, 0.0, 100.0, 200.0));
        }
        assert_eq!(smoother.len(), 3);
        smoother.reset();
        assert!(smoother.is_empty());
    }
}
