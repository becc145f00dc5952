use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::detect::SmoothingFactors;
use crate::engine::{FpsThresholds, QualitySettings, QualityTier};
use crate::ingest::FacingMode;
use crate::scene::DoorStyle;

const DEFAULT_CAMERA_DEVICE: &str = "stub://camera";
const DEFAULT_CAMERA_WIDTH: u32 = 1280;
const DEFAULT_CAMERA_HEIGHT: u32 = 720;
const DEFAULT_CAMERA_TIMEOUT_MS: u64 = 5_000;

const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
const DEFAULT_MIN_SIZE: f32 = 50.0;
const DEFAULT_MAX_SIZE: f32 = 2_000.0;
const DEFAULT_MIN_ASPECT_RATIO: f32 = 1.2;
const DEFAULT_MAX_ASPECT_RATIO: f32 = 4.0;
const DEFAULT_RELEVANT_CLASSES: [&str; 6] = ["door", "window", "person", "bottle", "cup", "backpack"];
const DEFAULT_MAX_DETECTIONS: usize = 10;
const DEFAULT_SAMPLING_INTERVAL: u32 = 3;
const DEFAULT_HISTORY_LEN: usize = 5;
const DEFAULT_SMOOTHING_WINDOW: usize = 3;
const DEFAULT_DETECTOR_LOAD_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_SURFACE_WIDTH: u32 = 1280;
const DEFAULT_SURFACE_HEIGHT: u32 = 720;

const DEFAULT_MAX_CACHED_MODELS: usize = 3;
const DEFAULT_HINT_DURATION_MS: u64 = 3_000;
const DEFAULT_SCREENSHOT_HINT_MS: u64 = 2_000;

// ----------------------------------------------------------------------------
// File representation: every field optional, merged over defaults.
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct ArConfigFile {
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    render: Option<RenderConfigFile>,
    lighting: Option<LightingConfigFile>,
    placement: Option<PlacementConfigFile>,
    models: Option<ModelsConfigFile>,
    performance: Option<PerformanceConfigFile>,
    ui: Option<UiConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    facing: Option<FacingMode>,
    frame_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    min_confidence: Option<f32>,
    min_size: Option<f32>,
    max_size: Option<f32>,
    min_aspect_ratio: Option<f32>,
    max_aspect_ratio: Option<f32>,
    relevant_classes: Option<Vec<String>>,
    max_detections: Option<usize>,
    sampling_interval: Option<u32>,
    history_len: Option<usize>,
    smoothing: Option<bool>,
    smoothing_window: Option<usize>,
    smoothing_position_alpha: Option<f32>,
    smoothing_size_alpha: Option<f32>,
    smoothing_center_alpha: Option<f32>,
    load_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    fov: Option<f32>,
    near: Option<f32>,
    far: Option<f32>,
    camera_position: Option<[f32; 3]>,
    width: Option<u32>,
    height: Option<u32>,
    pixel_ratio: Option<f32>,
    shadows: Option<bool>,
    shadow_map_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LightingConfigFile {
    ambient_color: Option<u32>,
    ambient_intensity: Option<f32>,
    directional_color: Option<u32>,
    directional_intensity: Option<f32>,
    directional_position: Option<[f32; 3]>,
}

#[derive(Debug, Deserialize, Default)]
struct PlacementConfigFile {
    position_alpha: Option<f32>,
    scale_alpha: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    default: Option<String>,
    cache_models: Option<bool>,
    max_cached_models: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct PerformanceConfigFile {
    adaptive_quality: Option<bool>,
    initial_tier: Option<QualityTier>,
    fps_thresholds: Option<FpsThresholds>,
    fps_report_every: Option<u64>,
    quality_eval_every: Option<u64>,
    low: Option<QualitySettings>,
    medium: Option<QualitySettings>,
    high: Option<QualitySettings>,
}

#[derive(Debug, Deserialize, Default)]
struct UiConfigFile {
    hint_duration_ms: Option<u64>,
    screenshot_hint_ms: Option<u64>,
}

// ----------------------------------------------------------------------------
// Resolved configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArConfig {
    pub camera: CameraSettings,
    pub detection: DetectionSettings,
    pub render: RenderSettings,
    pub lighting: LightingSettings,
    pub placement: PlacementSettings,
    pub models: ModelSettings,
    pub performance: PerformanceSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Device identifier (`stub://...` for synthetic, `/dev/videoN` for V4L2).
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    /// Upper bound on waiting for the first decodable frame.
    pub frame_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub min_confidence: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
    /// Proxy classes standing in for doorway-adjacent objects.
    pub relevant_classes: Vec<String>,
    pub max_detections: usize,
    /// Frames between detector invocations before any quality tier applies.
    pub sampling_interval: u32,
    pub history_len: usize,
    /// Blend each new detection with the previous one before placement.
    pub smoothing: bool,
    pub smoothing_window: usize,
    /// Blend toward the newest box for position, size and center.
    pub smoothing_factors: SmoothingFactors,
    pub load_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: [f32; 3],
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub shadows: bool,
    pub shadow_map_size: u32,
}

#[derive(Debug, Clone)]
pub struct LightingSettings {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct PlacementSettings {
    pub position_alpha: f32,
    pub scale_alpha: f32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub default_model: DoorStyle,
    pub cache_models: bool,
    pub max_cached_models: usize,
}

#[derive(Debug, Clone)]
pub struct PerformanceSettings {
    pub adaptive_quality: bool,
    pub initial_tier: QualityTier,
    pub fps_thresholds: FpsThresholds,
    pub fps_report_every: u64,
    pub quality_eval_every: u64,
    pub low: QualitySettings,
    pub medium: QualitySettings,
    pub high: QualitySettings,
}

impl PerformanceSettings {
    /// Settings bundle for a tier.
    pub fn settings_for(&self, tier: QualityTier) -> QualitySettings {
        match tier {
            QualityTier::Low => self.low,
            QualityTier::Medium => self.medium,
            QualityTier::High => self.high,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub hint_duration: Duration,
    pub screenshot_hint: Duration,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings {
                device: DEFAULT_CAMERA_DEVICE.to_string(),
                width: DEFAULT_CAMERA_WIDTH,
                height: DEFAULT_CAMERA_HEIGHT,
                facing: FacingMode::Environment,
                frame_timeout: Duration::from_millis(DEFAULT_CAMERA_TIMEOUT_MS),
            },
            detection: DetectionSettings {
                min_confidence: DEFAULT_MIN_CONFIDENCE,
                min_size: DEFAULT_MIN_SIZE,
                max_size: DEFAULT_MAX_SIZE,
                min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
                max_aspect_ratio: DEFAULT_MAX_ASPECT_RATIO,
                relevant_classes: DEFAULT_RELEVANT_CLASSES
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                max_detections: DEFAULT_MAX_DETECTIONS,
                sampling_interval: DEFAULT_SAMPLING_INTERVAL,
                history_len: DEFAULT_HISTORY_LEN,
                smoothing: false,
                smoothing_window: DEFAULT_SMOOTHING_WINDOW,
                smoothing_factors: SmoothingFactors::default(),
                load_timeout: Duration::from_millis(DEFAULT_DETECTOR_LOAD_TIMEOUT_MS),
            },
            render: RenderSettings {
                fov: 75.0,
                near: 0.1,
                far: 1000.0,
                camera_position: [0.0, 0.0, 8.0],
                width: DEFAULT_SURFACE_WIDTH,
                height: DEFAULT_SURFACE_HEIGHT,
                pixel_ratio: 1.0,
                shadows: true,
                shadow_map_size: 1024,
            },
            lighting: LightingSettings {
                ambient_color: 0xffffff,
                ambient_intensity: 0.6,
                directional_color: 0xffffff,
                directional_intensity: 0.8,
                directional_position: [5.0, 10.0, 7.0],
            },
            placement: PlacementSettings {
                position_alpha: 0.1,
                scale_alpha: 0.1,
            },
            models: ModelSettings {
                default_model: DoorStyle::Classic,
                cache_models: true,
                max_cached_models: DEFAULT_MAX_CACHED_MODELS,
            },
            performance: PerformanceSettings {
                adaptive_quality: true,
                initial_tier: QualityTier::for_device(),
                fps_thresholds: FpsThresholds::default(),
                fps_report_every: 30,
                quality_eval_every: 300,
                low: QualitySettings {
                    pixel_ratio: 0.75,
                    shadows: false,
                    detection_interval: 10,
                },
                medium: QualitySettings {
                    pixel_ratio: 1.0,
                    shadows: false,
                    detection_interval: 5,
                },
                high: QualitySettings {
                    pixel_ratio: 1.5,
                    shadows: true,
                    detection_interval: 3,
                },
            },
            ui: UiSettings {
                hint_duration: Duration::from_millis(DEFAULT_HINT_DURATION_MS),
                screenshot_hint: Duration::from_millis(DEFAULT_SCREENSHOT_HINT_MS),
            },
        }
    }
}

impl ArConfig {
    /// Defaults, then the file named by `AR_CONFIG` (JSON or TOML), then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("AR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file without consulting `AR_CONFIG`; env overrides still apply.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ArConfigFile) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(camera) = file.camera {
            let c = &mut cfg.camera;
            if let Some(device) = camera.device {
                c.device = device;
            }
            c.width = camera.width.unwrap_or(c.width);
            c.height = camera.height.unwrap_or(c.height);
            c.facing = camera.facing.unwrap_or(c.facing);
            if let Some(ms) = camera.frame_timeout_ms {
                c.frame_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(detection) = file.detection {
            let d = &mut cfg.detection;
            d.min_confidence = detection.min_confidence.unwrap_or(d.min_confidence);
            d.min_size = detection.min_size.unwrap_or(d.min_size);
            d.max_size = detection.max_size.unwrap_or(d.max_size);
            d.min_aspect_ratio = detection.min_aspect_ratio.unwrap_or(d.min_aspect_ratio);
            d.max_aspect_ratio = detection.max_aspect_ratio.unwrap_or(d.max_aspect_ratio);
            if let Some(classes) = detection.relevant_classes {
                d.relevant_classes = classes;
            }
            d.max_detections = detection.max_detections.unwrap_or(d.max_detections);
            d.sampling_interval = detection.sampling_interval.unwrap_or(d.sampling_interval);
            d.history_len = detection.history_len.unwrap_or(d.history_len);
            d.smoothing = detection.smoothing.unwrap_or(d.smoothing);
            d.smoothing_window = detection.smoothing_window.unwrap_or(d.smoothing_window);
            let f = &mut d.smoothing_factors;
            f.position = detection.smoothing_position_alpha.unwrap_or(f.position);
            f.size = detection.smoothing_size_alpha.unwrap_or(f.size);
            f.center = detection.smoothing_center_alpha.unwrap_or(f.center);
            if let Some(ms) = detection.load_timeout_ms {
                d.load_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(render) = file.render {
            let r = &mut cfg.render;
            r.fov = render.fov.unwrap_or(r.fov);
            r.near = render.near.unwrap_or(r.near);
            r.far = render.far.unwrap_or(r.far);
            r.camera_position = render.camera_position.unwrap_or(r.camera_position);
            r.width = render.width.unwrap_or(r.width);
            r.height = render.height.unwrap_or(r.height);
            r.pixel_ratio = render.pixel_ratio.unwrap_or(r.pixel_ratio);
            r.shadows = render.shadows.unwrap_or(r.shadows);
            r.shadow_map_size = render.shadow_map_size.unwrap_or(r.shadow_map_size);
        }

        if let Some(lighting) = file.lighting {
            let l = &mut cfg.lighting;
            l.ambient_color = lighting.ambient_color.unwrap_or(l.ambient_color);
            l.ambient_intensity = lighting.ambient_intensity.unwrap_or(l.ambient_intensity);
            l.directional_color = lighting.directional_color.unwrap_or(l.directional_color);
            l.directional_intensity = lighting
                .directional_intensity
                .unwrap_or(l.directional_intensity);
            l.directional_position = lighting
                .directional_position
                .unwrap_or(l.directional_position);
        }

        if let Some(placement) = file.placement {
            let p = &mut cfg.placement;
            p.position_alpha = placement.position_alpha.unwrap_or(p.position_alpha);
            p.scale_alpha = placement.scale_alpha.unwrap_or(p.scale_alpha);
        }

        if let Some(models) = file.models {
            let m = &mut cfg.models;
            if let Some(default) = models.default {
                m.default_model = default.parse()?;
            }
            m.cache_models = models.cache_models.unwrap_or(m.cache_models);
            m.max_cached_models = models.max_cached_models.unwrap_or(m.max_cached_models);
        }

        if let Some(performance) = file.performance {
            let p = &mut cfg.performance;
            p.adaptive_quality = performance.adaptive_quality.unwrap_or(p.adaptive_quality);
            p.initial_tier = performance.initial_tier.unwrap_or(p.initial_tier);
            p.fps_thresholds = performance.fps_thresholds.unwrap_or(p.fps_thresholds);
            p.fps_report_every = performance.fps_report_every.unwrap_or(p.fps_report_every);
            p.quality_eval_every = performance
                .quality_eval_every
                .unwrap_or(p.quality_eval_every);
            p.low = performance.low.unwrap_or(p.low);
            p.medium = performance.medium.unwrap_or(p.medium);
            p.high = performance.high.unwrap_or(p.high);
        }

        if let Some(ui) = file.ui {
            if let Some(ms) = ui.hint_duration_ms {
                cfg.ui.hint_duration = Duration::from_millis(ms);
            }
            if let Some(ms) = ui.screenshot_hint_ms {
                cfg.ui.screenshot_hint = Duration::from_millis(ms);
            }
        }

        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("AR_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(value) = std::env::var("AR_MIN_CONFIDENCE") {
            self.detection.min_confidence = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("AR_MIN_CONFIDENCE must be a number in [0, 1]"))?;
        }
        if let Ok(value) = std::env::var("AR_SAMPLING_INTERVAL") {
            self.detection.sampling_interval = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("AR_SAMPLING_INTERVAL must be a positive integer"))?;
        }
        if let Ok(value) = std::env::var("AR_ADAPTIVE_QUALITY") {
            self.performance.adaptive_quality = parse_bool(&value)
                .ok_or_else(|| anyhow!("AR_ADAPTIVE_QUALITY must be true/false"))?;
        }
        if let Ok(model) = std::env::var("AR_DEFAULT_MODEL") {
            if !model.trim().is_empty() {
                self.models.default_model = model.trim().parse()?;
            }
        }
        if let Ok(classes) = std::env::var("AR_RELEVANT_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.detection.relevant_classes = parsed;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let d = &mut self.detection;
        if !(0.0..=1.0).contains(&d.min_confidence) {
            return Err(anyhow!("detection.min_confidence must be within [0, 1]"));
        }
        if d.min_size > d.max_size {
            return Err(anyhow!("detection.min_size must not exceed max_size"));
        }
        if d.min_aspect_ratio > d.max_aspect_ratio {
            return Err(anyhow!(
                "detection.min_aspect_ratio must not exceed max_aspect_ratio"
            ));
        }
        if d.sampling_interval == 0 {
            return Err(anyhow!("detection.sampling_interval must be greater than zero"));
        }
        if d.history_len == 0 || d.smoothing_window == 0 {
            return Err(anyhow!("detection history sizes must be greater than zero"));
        }
        d.relevant_classes = d
            .relevant_classes
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        let smoothing = self.detection.smoothing_factors;
        for (name, alpha) in [
            ("placement.position_alpha", self.placement.position_alpha),
            ("placement.scale_alpha", self.placement.scale_alpha),
            ("detection.smoothing_position_alpha", smoothing.position),
            ("detection.smoothing_size_alpha", smoothing.size),
            ("detection.smoothing_center_alpha", smoothing.center),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(anyhow!("{} must be within (0, 1]", name));
            }
        }

        if self.models.max_cached_models == 0 {
            return Err(anyhow!("models.max_cached_models must be greater than zero"));
        }

        let p = &self.performance;
        p.fps_thresholds.validate()?;
        if p.fps_report_every == 0 || p.quality_eval_every == 0 {
            return Err(anyhow!("performance windows must be greater than zero"));
        }
        for tier in [QualityTier::Low, QualityTier::Medium, QualityTier::High] {
            let settings = p.settings_for(tier);
            if settings.detection_interval == 0 || settings.pixel_ratio <= 0.0 {
                return Err(anyhow!("quality tier {} has invalid settings", tier));
            }
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(anyhow!("render surface size must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ArConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let mut cfg = ArConfig::default();
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.detection.relevant_classes.len(), 6);
        assert_eq!(cfg.models.max_cached_models, 3);
    }

    #[test]
    fn rejects_descending_thresholds() {
        let mut cfg = ArConfig::default();
        cfg.performance.fps_thresholds = FpsThresholds {
            low: 40.0,
            medium: 30.0,
            high: 50.0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_alpha_and_interval() {
        let mut cfg = ArConfig::default();
        cfg.placement.scale_alpha = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ArConfig::default();
        cfg.detection.sampling_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ArConfig::default();
        cfg.detection.smoothing_factors.size = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn class_list_is_normalized() {
        let mut cfg = ArConfig::default();
        cfg.detection.relevant_classes = vec![" Door ".into(), "".into(), "WINDOW".into()];
        cfg.validate().unwrap();
        assert_eq!(cfg.detection.relevant_classes, vec!["door", "window"]);
    }

    #[test]
    fn toml_sections_merge_over_defaults() {
        let file: ArConfigFile = toml::from_str(
            r#"
            [detection]
            min_confidence = 0.7
            relevant_classes = ["door"]

            [models]
            default = "door_glass"
            max_cached_models = 2
            "#,
        )
        .unwrap();
        let cfg = ArConfig::from_file(file).unwrap();
        assert_eq!(cfg.detection.min_confidence, 0.7);
        assert_eq!(cfg.detection.relevant_classes, vec!["door"]);
        assert_eq!(cfg.detection.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(cfg.models.default_model, DoorStyle::Glass);
        assert_eq!(cfg.models.max_cached_models, 2);
    }

    #[test]
    fn unknown_default_model_is_rejected() {
        let file: ArConfigFile =
            serde_json::from_str(r#"{ "models": { "default": "door_barn" } }"#).unwrap();
        assert!(ArConfig::from_file(file).is_err());
    }
}
