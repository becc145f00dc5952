use std::fmt;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::config::PerformanceSettings;

/// Discrete rendering quality level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Starting tier from the number of hardware threads.
    pub fn for_parallelism(threads: usize) -> Self {
        match threads {
            n if n >= 8 => QualityTier::High,
            n if n >= 4 => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }

    /// Starting tier for the current machine.
    pub fn for_device() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::for_parallelism(threads)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings bundle applied when a tier becomes active.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct QualitySettings {
    pub pixel_ratio: f32,
    pub shadows: bool,
    /// Frames between detector invocations.
    pub detection_interval: u32,
}

/// FPS band edges, strictly ascending.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FpsThresholds {
    pub low: f32,
    pub medium: f32,
    pub high: f32,
}

impl Default for FpsThresholds {
    fn default() -> Self {
        Self {
            low: 20.0,
            medium: 30.0,
            high: 50.0,
        }
    }
}

impl FpsThresholds {
    pub fn validate(&self) -> Result<()> {
        if !(self.low > 0.0 && self.low < self.medium && self.medium < self.high) {
            return Err(anyhow!(
                "performance.fps_thresholds must satisfy 0 < low < medium < high (got {}/{}/{})",
                self.low,
                self.medium,
                self.high
            ));
        }
        Ok(())
    }
}

/// Tier for a measured frame rate.
///
/// Below `low` drops to low, below `medium` to medium, at or above `high`
/// rises to high. Readings in `[medium, high)` keep the current tier.
pub fn evaluate_tier(fps: f32, current: QualityTier, thresholds: &FpsThresholds) -> QualityTier {
    if fps < thresholds.low {
        QualityTier::Low
    } else if fps < thresholds.medium {
        QualityTier::Medium
    } else if fps >= thresholds.high {
        QualityTier::High
    } else {
        current
    }
}

/// Tier state plus the evaluation window.
#[derive(Debug, Clone)]
pub struct AdaptiveQuality {
    enabled: bool,
    tier: QualityTier,
    thresholds: FpsThresholds,
    eval_every: u64,
    tiers: [QualitySettings; 3],
}

impl AdaptiveQuality {
    pub fn new(settings: &PerformanceSettings) -> Self {
        Self {
            enabled: settings.adaptive_quality,
            tier: settings.initial_tier,
            thresholds: settings.fps_thresholds,
            eval_every: settings.quality_eval_every.max(1),
            tiers: [settings.low, settings.medium, settings.high],
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn settings(&self) -> QualitySettings {
        self.settings_for(self.tier)
    }

    pub fn settings_for(&self, tier: QualityTier) -> QualitySettings {
        match tier {
            QualityTier::Low => self.tiers[0],
            QualityTier::Medium => self.tiers[1],
            QualityTier::High => self.tiers[2],
        }
    }

    pub fn is_evaluation_frame(&self, frame: u64) -> bool {
        self.enabled && frame > 0 && frame % self.eval_every == 0
    }

    /// Re-evaluate at frame `frame`. Returns the new tier's settings when the
    /// tier changed; `None` off-window, when disabled, or when unchanged.
    pub fn on_frame(&mut self, frame: u64, fps: f32) -> Option<QualitySettings> {
        if !self.is_evaluation_frame(frame) {
            return None;
        }
        let next = evaluate_tier(fps, self.tier, &self.thresholds);
        if next == self.tier {
            return None;
        }
        log::info!(
            "quality tier {} -> {} at frame {} ({} fps)",
            self.tier,
            next,
            frame,
            fps
        );
        self.tier = next;
        Some(self.settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArConfig;

    fn thresholds() -> FpsThresholds {
        FpsThresholds::default()
    }

    #[test]
    fn bands_follow_thresholds() {
        let t = thresholds();
        assert_eq!(evaluate_tier(12.0, QualityTier::High, &t), QualityTier::Low);
        assert_eq!(evaluate_tier(25.0, QualityTier::High, &t), QualityTier::Medium);
        assert_eq!(evaluate_tier(55.0, QualityTier::Low, &t), QualityTier::High);
    }

    #[test]
    fn hysteresis_band_keeps_current_tier() {
        let t = thresholds();
        for tier in [QualityTier::Low, QualityTier::Medium, QualityTier::High] {
            assert_eq!(evaluate_tier(30.0, tier, &t), tier);
            assert_eq!(evaluate_tier(49.9, tier, &t), tier);
        }
    }

    #[test]
    fn changes_only_on_window_and_crossing() {
        let mut perf = ArConfig::default().performance;
        perf.initial_tier = QualityTier::Medium;
        let mut quality = AdaptiveQuality::new(&perf);

        // FPS drops below the low threshold at frame 450.
        for frame in 1..=900u64 {
            let fps = if frame < 450 { 25.0 } else { 15.0 };
            let change = quality.on_frame(frame, fps);
            match frame {
                600 => assert_eq!(change.map(|s| s.detection_interval), Some(10)),
                _ => assert!(change.is_none(), "unexpected change at {}", frame),
            }
            let expected = if frame < 600 {
                QualityTier::Medium
            } else {
                QualityTier::Low
            };
            assert_eq!(quality.tier(), expected);
        }
    }

    #[test]
    fn disabled_never_changes() {
        let mut perf = ArConfig::default().performance;
        perf.adaptive_quality = false;
        perf.initial_tier = QualityTier::High;
        let mut quality = AdaptiveQuality::new(&perf);
        assert!(quality.on_frame(300, 1.0).is_none());
        assert_eq!(quality.tier(), QualityTier::High);
    }

    #[test]
    fn device_probe_maps_thread_counts() {
        assert_eq!(QualityTier::for_parallelism(16), QualityTier::High);
        assert_eq!(QualityTier::for_parallelism(4), QualityTier::Medium);
        assert_eq!(QualityTier::for_parallelism(2), QualityTier::Low);
    }

    #[test]
    fn thresholds_must_ascend() {
        assert!(thresholds().validate().is_ok());
        let flat = FpsThresholds {
            low: 30.0,
            medium: 30.0,
            high: 50.0,
        };
        assert!(flat.validate().is_err());
    }
}
