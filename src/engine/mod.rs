//! Frame orchestrator.
//!
//! `Engine` moves through `Idle -> Starting -> Running -> Stopping -> Idle`.
//! It owns the camera source, detection service and render surface while
//! running and holds none of them while idle. All work happens on the thread
//! that calls `run`/`tick_at`; the UI reaches the engine through
//! `EngineCommand` messages.

mod command;
mod driver;
mod quality;

pub use command::EngineCommand;
pub use driver::{FrameDriver, IntervalDriver, ManualDriver};
pub use quality::{evaluate_tier, AdaptiveQuality, FpsThresholds, QualitySettings, QualityTier};

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::{ArConfig, CameraSettings, RenderSettings};
use crate::detect::{Detection, DetectionService, DetectorLoader};
use crate::error::{CameraError, EngineError, EngineResult};
use crate::ingest::{CameraSource, CaptureConstraints, CaptureDevice};
use crate::render::{GraphicsBackend, RenderSurface, SceneInfo};
use crate::scene::{DoorGenerator, DoorStyle};
use crate::ui::{Screen, StatusKind, UiBoundary};

const VIDEO_TARGET: &str = "camera-feed";

const MSG_STARTING_CAMERA: &str = "Starting camera...";
const MSG_LOADING_DETECTOR: &str = "Loading detection model...";
const MSG_PREPARING_SCENE: &str = "Preparing 3D scene...";
const MSG_LOADING_MODEL: &str = "Loading door model...";
const STATUS_READY: &str = "Ready";
const STATUS_DETECTED: &str = "Doorway detected!";
const STATUS_SEARCHING: &str = "Searching for a doorway...";
const STATUS_NO_DETECTION: &str = "No-detection mode";
const HINT_MOVE_CAMERA: &str = "Point the camera at a doorway";
const HINT_NO_DETECTION: &str = "Automatic doorway detection is unavailable";
const HINT_SCREENSHOT_SAVED: &str = "Screenshot saved!";

/// Platform capabilities the engine acquires on `start`.
pub trait Platform: Send {
    fn open_camera(&mut self, settings: &CameraSettings) -> anyhow::Result<Box<dyn CaptureDevice>>;

    /// `None` runs without detection.
    fn detector_loader(&mut self) -> Option<Arc<dyn DetectorLoader>>;

    fn create_graphics(&mut self, settings: &RenderSettings)
        -> anyhow::Result<Box<dyn GraphicsBackend>>;

    fn door_generator(&mut self) -> Box<dyn DoorGenerator>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Session state visible to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    pub running: bool,
    pub frame_count: u64,
    pub performance_level: QualityTier,
    pub current_detection: Option<Detection>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineStatus {
    pub running: bool,
    pub frame_count: u64,
    pub performance_level: QualityTier,
    pub detection_active: bool,
    pub camera_active: bool,
    pub detector_ready: bool,
    pub scene_ready: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceInfo {
    pub fps: u32,
    pub performance_level: QualityTier,
    pub quality: QualitySettings,
    pub detection_interval: u32,
    pub camera_resolution: Option<String>,
    pub scene: Option<SceneInfo>,
}

pub struct Engine {
    config: ArConfig,
    platform: Box<dyn Platform>,
    ui: Box<dyn UiBoundary>,
    phase: Phase,
    camera: Option<CameraSource>,
    detector: Option<DetectionService>,
    surface: Option<RenderSurface>,
    quality: AdaptiveQuality,
    /// True once adaptation has replaced the startup render settings.
    quality_adapted: bool,
    detection_interval: u32,
    frame_count: u64,
    current_detection: Option<Detection>,
    selected_model: DoorStyle,
}

impl Engine {
    pub fn new(config: ArConfig, platform: Box<dyn Platform>, ui: Box<dyn UiBoundary>) -> Self {
        let quality = AdaptiveQuality::new(&config.performance);
        log::info!("initial quality tier: {}", quality.tier());
        Self {
            quality,
            quality_adapted: false,
            detection_interval: config.detection.sampling_interval,
            selected_model: config.models.default_model,
            config,
            platform,
            ui,
            phase: Phase::Idle,
            camera: None,
            detector: None,
            surface: None,
            frame_count: 0,
            current_detection: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn config(&self) -> &ArConfig {
        &self.config
    }

    /// Acquire camera, detector and render surface, then enter `Running`.
    ///
    /// Camera, graphics and door model failures are fatal: everything acquired
    /// so far is released and the engine returns to `Idle`. A detector that
    /// fails to load only degrades to no-detection mode.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.phase != Phase::Idle {
            log::debug!("start ignored while {:?}", self.phase);
            return Ok(());
        }
        log::info!("starting AR session");
        self.phase = Phase::Starting;

        match self.acquire() {
            Ok(()) => {
                self.phase = Phase::Running;
                self.ui.set_screen(Screen::Ar);
                self.ui.hide_loading();
                self.ui.set_status(STATUS_READY, StatusKind::Success);
                self.ui.show_hint(HINT_MOVE_CAMERA, self.config.ui.hint_duration);
                log::info!("AR session running");
                Ok(())
            }
            Err(err) => {
                log::error!("start failed: {}", err);
                self.ui.hide_loading();
                self.ui.show_error(&err.user_message());
                self.release();
                self.phase = Phase::Idle;
                Err(err)
            }
        }
    }

    fn acquire(&mut self) -> EngineResult<()> {
        self.ui.show_loading(MSG_STARTING_CAMERA);
        let device = self
            .platform
            .open_camera(&self.config.camera)
            .map_err(|e| match e.downcast::<CameraError>() {
                Ok(err) => EngineError::from(err),
                Err(e) => EngineError::CameraUnavailable(CameraError::Unknown(format!("{:#}", e))),
            })?;
        let camera = self.camera.insert(CameraSource::new(device));
        camera.init(VIDEO_TARGET);
        camera.request_access(
            &CaptureConstraints::from(&self.config.camera),
            self.config.camera.frame_timeout,
        )?;

        self.ui.show_loading(MSG_LOADING_DETECTOR);
        let mut detector = DetectionService::new(&self.config.detection);
        let loaded = match self.platform.detector_loader() {
            Some(loader) => detector.init(loader),
            None => Err(EngineError::DetectionUnavailable(
                "no detector configured".to_string(),
            )),
        };
        if let Err(err) = loaded {
            log::warn!("continuing without detection: {}", err);
            self.ui.show_hint(HINT_NO_DETECTION, self.config.ui.hint_duration);
        }
        self.detector = Some(detector);

        self.ui.show_loading(MSG_PREPARING_SCENE);
        let backend = self
            .platform
            .create_graphics(&self.config.render)
            .map_err(|e| EngineError::RenderInit(format!("{:#}", e)))?;
        let doors = self.platform.door_generator();
        let surface = self
            .surface
            .insert(RenderSurface::init(&self.config, backend, doors)?);
        if self.quality_adapted {
            surface.apply_quality(&self.quality.settings());
        }

        self.ui.show_loading(MSG_LOADING_MODEL);
        self.attach_door(self.selected_model)
    }

    /// Leave `Running` and release everything. Safe to call at any time.
    pub fn stop(&mut self) {
        let was_running = self.phase == Phase::Running;
        if was_running {
            log::info!("stopping AR session");
            self.phase = Phase::Stopping;
        }
        self.release();
        self.phase = Phase::Idle;
        if was_running {
            self.ui.set_screen(Screen::Start);
        }
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        if let Some(mut detector) = self.detector.take() {
            detector.dispose();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.frame_count = 0;
        self.current_detection = None;
    }

    /// Generate (or fetch) `style` and attach it. On failure the previous
    /// door stays attached and the error is shown to the user.
    pub fn load_door_model(&mut self, style: DoorStyle) -> EngineResult<()> {
        if self.surface.is_none() {
            return Err(EngineError::NotRunning);
        }
        self.ui.show_loading(MSG_LOADING_MODEL);
        let result = self.attach_door(style);
        self.ui.hide_loading();
        if let Err(err) = &result {
            self.ui.show_error(&err.user_message());
        }
        result
    }

    fn attach_door(&mut self, style: DoorStyle) -> EngineResult<()> {
        let surface = self.surface.as_mut().ok_or(EngineError::NotRunning)?;
        let asset = surface.load_door_model(style).map_err(|err| {
            log::error!("door model {} failed: {}", style, err);
            EngineError::from(err)
        })?;
        surface.set_door_model(&asset);
        self.selected_model = style;
        self.ui.model_selected(style);
        Ok(())
    }

    /// Select a door by style id. While idle the choice is kept for the next start.
    pub fn select_model(&mut self, id: &str) -> EngineResult<()> {
        let style = match id.parse::<DoorStyle>() {
            Ok(style) => style,
            Err(err) => {
                log::warn!("{}", err);
                let err = EngineError::from(err);
                self.ui.show_error(&err.user_message());
                return Err(err);
            }
        };
        if self.surface.is_some() {
            self.load_door_model(style)
        } else {
            self.selected_model = style;
            self.ui.model_selected(style);
            Ok(())
        }
    }

    pub fn selected_model(&self) -> DoorStyle {
        self.selected_model
    }

    /// Encode the current frame and hand it to the UI as `ar-door-<millis>.png`.
    pub fn take_screenshot(&mut self) -> EngineResult<()> {
        let result = match self.surface.as_ref() {
            Some(surface) => surface.take_screenshot(),
            None => Err(EngineError::Screenshot("scene is not initialized".to_string())),
        };
        match result {
            Ok(png) => {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                let file_name = format!("ar-door-{}.png", millis);
                log::info!("screenshot {} ({} bytes)", file_name, png.len());
                self.ui.deliver_screenshot(&file_name, png);
                self.ui
                    .show_hint(HINT_SCREENSHOT_SAVED, self.config.ui.screenshot_hint);
                Ok(())
            }
            Err(err) => {
                log::error!("{}", err);
                self.ui.show_error(&err.user_message());
                Err(err)
            }
        }
    }

    /// Track a new drawing-surface size, now and for later sessions.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.render.width = width;
        self.config.render.height = height;
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
    }

    /// One loop iteration at `now`. Errors are logged; the loop never stops on them.
    pub fn tick_at(&mut self, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        self.frame_count += 1;

        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        camera.advance_frame();

        let detector_ready = self.detector.as_ref().is_some_and(|d| d.is_ready());
        if detector_ready && camera.should_sample_now(self.detection_interval) {
            match camera.current_frame() {
                Ok(Some(frame)) => {
                    self.current_detection =
                        self.detector.as_mut().and_then(|d| d.detect(&frame));
                    if self.current_detection.is_some() {
                        self.ui.set_status(STATUS_DETECTED, StatusKind::Success);
                        self.ui.hide_hint();
                    } else {
                        self.ui.set_status(STATUS_SEARCHING, StatusKind::Loading);
                        self.ui.show_hint(HINT_MOVE_CAMERA, self.config.ui.hint_duration);
                    }
                }
                Ok(None) => {}
                Err(err) => log::warn!("frame {}: capture failed: {:#}", self.frame_count, err),
            }
        } else if !detector_ready {
            self.ui.set_status(STATUS_NO_DETECTION, StatusKind::Warning);
        }
        let (frame_w, frame_h) = camera.frame_size();

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.position_door(self.current_detection.as_ref(), frame_w, frame_h);
        if let Err(err) = surface.render_at(now) {
            log::warn!("frame {}: render failed: {:#}", self.frame_count, err);
        }

        let fps = surface.fps();
        if self.frame_count % self.config.performance.fps_report_every.max(1) == 0 {
            self.ui.update_fps(fps);
        }
        if let Some(settings) = self.quality.on_frame(self.frame_count, fps as f32) {
            surface.apply_quality(&settings);
            self.detection_interval = settings.detection_interval;
            self.quality_adapted = true;
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Apply one UI command. Returns false once the engine should shut down.
    pub fn handle(&mut self, command: EngineCommand) -> bool {
        log::debug!("command: {:?}", command);
        let result = match command {
            EngineCommand::Start => self.start(),
            EngineCommand::Stop => {
                self.stop();
                Ok(())
            }
            EngineCommand::TakeScreenshot => self.take_screenshot(),
            EngineCommand::SelectModel(id) => self.select_model(&id),
            EngineCommand::Resize { width, height } => {
                self.resize(width, height);
                Ok(())
            }
            EngineCommand::VisibilityChanged { hidden } => {
                if hidden && self.is_running() {
                    log::info!("view hidden, stopping");
                    self.stop();
                }
                Ok(())
            }
            EngineCommand::Shutdown => {
                self.stop();
                return false;
            }
        };
        if let Err(err) = result {
            // Already reported to the UI.
            log::debug!("command failed: {}", err);
        }
        true
    }

    /// Drive the engine until `Shutdown`, until the driver runs out of frames,
    /// or until the command channel closes while idle.
    pub fn run(&mut self, driver: &mut dyn FrameDriver, commands: &Receiver<EngineCommand>) {
        let mut commands_open = true;
        loop {
            while commands_open {
                match commands.try_recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => commands_open = false,
                }
            }

            if !self.is_running() {
                if !commands_open {
                    return;
                }
                // Nothing to draw: wait for the next command.
                match commands.recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                    }
                    Err(_) => return,
                }
                continue;
            }

            match driver.next_frame() {
                Some(now) => self.tick_at(now),
                None => {
                    log::info!("frame driver finished after {} frames", self.frame_count);
                    self.stop();
                    return;
                }
            }
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            running: self.is_running(),
            frame_count: self.frame_count,
            performance_level: self.quality.tier(),
            current_detection: self.current_detection.clone(),
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.is_running(),
            frame_count: self.frame_count,
            performance_level: self.quality.tier(),
            detection_active: self.current_detection.is_some(),
            camera_active: self.camera.as_ref().is_some_and(|c| c.is_running()),
            detector_ready: self.detector.as_ref().is_some_and(|d| d.is_ready()),
            scene_ready: self.surface.as_ref().is_some_and(|s| s.is_ready()),
        }
    }

    pub fn performance_info(&self) -> PerformanceInfo {
        PerformanceInfo {
            fps: self.surface.as_ref().map_or(0, |s| s.fps()),
            performance_level: self.quality.tier(),
            quality: self.quality.settings(),
            detection_interval: self.detection_interval,
            camera_resolution: self.camera.as_ref().map(|c| c.resolution()),
            scene: self.surface.as_ref().map(|s| s.scene_info()),
        }
    }

    pub fn detection_stats(&self) -> Option<crate::detect::DetectionStats> {
        self.detector.as_ref().and_then(|d| d.stats())
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut RenderSurface> {
        self.surface.as_mut()
    }

    /// True while any camera, detector or render handle is held.
    pub fn holds_resources(&self) -> bool {
        self.camera.is_some() || self.detector.is_some() || self.surface.is_some()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::detect::{Prediction, ScriptedDetector, ScriptedLoader};
    use crate::ingest::SyntheticCamera;
    use crate::render::HeadlessRenderer;
    use crate::scene::ProceduralDoors;
    use crate::ui::{ChannelUi, UiEvent};

    #[derive(Default)]
    struct TestPlatform {
        camera_error: Option<CameraError>,
        loader: Option<Arc<dyn DetectorLoader>>,
        graphics_unavailable: bool,
    }

    impl Platform for TestPlatform {
        fn open_camera(&mut self, settings: &CameraSettings) -> anyhow::Result<Box<dyn CaptureDevice>> {
            let camera = SyntheticCamera::new(settings.device.clone());
            Ok(Box::new(match self.camera_error.clone() {
                Some(err) => camera.failing(err),
                None => camera,
            }))
        }

        fn detector_loader(&mut self) -> Option<Arc<dyn DetectorLoader>> {
            self.loader.clone()
        }

        fn create_graphics(&mut self, _settings: &RenderSettings) -> anyhow::Result<Box<dyn GraphicsBackend>> {
            if self.graphics_unavailable {
                return Ok(Box::new(HeadlessRenderer::unavailable("no GPU")));
            }
            Ok(Box::new(HeadlessRenderer::new()))
        }

        fn door_generator(&mut self) -> Box<dyn DoorGenerator> {
            Box::new(ProceduralDoors)
        }
    }

    fn config() -> ArConfig {
        let mut config = ArConfig::default();
        config.camera.width = 320;
        config.camera.height = 240;
        config.render.width = 320;
        config.render.height = 240;
        config.performance.initial_tier = QualityTier::Medium;
        config
    }

    fn door() -> Prediction {
        Prediction::new("door", 0.9, [100.0, 20.0, 80.0, 160.0])
    }

    fn engine(platform: TestPlatform) -> (Engine, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        let engine = Engine::new(config(), Box::new(platform), Box::new(ChannelUi::new(tx)));
        (engine, rx)
    }

    fn scripted(script: Vec<Vec<Prediction>>) -> TestPlatform {
        TestPlatform {
            loader: Some(Arc::new(ScriptedLoader::ready(ScriptedDetector::new(script)))),
            ..TestPlatform::default()
        }
    }

    fn statuses(rx: &mpsc::Receiver<UiEvent>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|e| match e {
                UiEvent::Status { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut engine, rx) = engine(scripted(vec![]));
        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());
        let status = engine.status();
        assert!(status.camera_active && status.detector_ready && status.scene_ready);

        engine.stop();
        engine.stop();
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.holds_resources());
        let screens: Vec<Screen> = rx
            .try_iter()
            .filter_map(|e| match e {
                UiEvent::Screen(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(screens, vec![Screen::Ar, Screen::Start]);
    }

    #[test]
    fn camera_failure_releases_everything() {
        let platform = TestPlatform {
            camera_error: Some(CameraError::PermissionDenied),
            ..scripted(vec![])
        };
        let (mut engine, rx) = engine(platform);
        let err = engine.start().unwrap_err();
        assert!(matches!(err, EngineError::CameraUnavailable(CameraError::PermissionDenied)));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.holds_resources());
        let events: Vec<UiEvent> = rx.try_iter().collect();
        assert!(events.contains(&UiEvent::LoadingDone));
        assert!(events.contains(&UiEvent::Error(
            CameraError::PermissionDenied.user_message().to_string()
        )));
    }

    #[test]
    fn graphics_failure_is_fatal() {
        let platform = TestPlatform {
            graphics_unavailable: true,
            ..scripted(vec![])
        };
        let (mut engine, _rx) = engine(platform);
        assert!(matches!(engine.start(), Err(EngineError::RenderInit(_))));
        assert!(!engine.holds_resources());
    }

    #[test]
    fn missing_detector_degrades_to_no_detection() {
        let platform = TestPlatform {
            loader: Some(Arc::new(ScriptedLoader::failing("model missing"))),
            ..TestPlatform::default()
        };
        let (mut engine, rx) = engine(platform);
        engine.start().unwrap();
        assert!(!engine.status().detector_ready);
        engine.tick();
        assert_eq!(statuses(&rx).last().map(String::as_str), Some(STATUS_NO_DETECTION));
    }

    #[test]
    fn detection_runs_on_sample_frames_and_persists() {
        let (mut engine, rx) = engine(scripted(vec![vec![door()], vec![]]));
        engine.start().unwrap();
        rx.try_iter().for_each(drop);
        let mut driver = ManualDriver::at_fps(60, 6);

        for _ in 0..2 {
            engine.tick_at(driver.next_frame().unwrap());
        }
        assert!(engine.state().current_detection.is_none());

        engine.tick_at(driver.next_frame().unwrap());
        let detection = engine.state().current_detection.unwrap();
        assert_eq!(detection.class, "door");
        assert_eq!(statuses(&rx), vec![STATUS_DETECTED.to_string()]);

        // Not a sample frame: the last detection stays.
        engine.tick_at(driver.next_frame().unwrap());
        assert!(engine.state().current_detection.is_some());
        let placement = engine.surface().and_then(|s| s.placement()).unwrap();
        assert!(placement.position.x != 0.0 || placement.scale != 1.0);

        engine.tick_at(driver.next_frame().unwrap());
        engine.tick_at(driver.next_frame().unwrap());
        assert!(engine.state().current_detection.is_none());
        assert_eq!(statuses(&rx), vec![STATUS_SEARCHING.to_string()]);
    }

    #[test]
    fn fps_is_reported_on_its_cadence() {
        let (mut engine, rx) = engine(scripted(vec![]));
        engine.start().unwrap();
        let mut driver = ManualDriver::at_fps(60, 61);
        while let Some(now) = driver.next_frame() {
            engine.tick_at(now);
        }
        let reports = rx
            .try_iter()
            .filter(|e| matches!(e, UiEvent::Fps(_)))
            .count();
        assert_eq!(reports, 2);
    }

    #[test]
    fn slow_frames_drop_to_low_tier_at_evaluation() {
        let (mut engine, _rx) = engine(scripted(vec![]));
        engine.start().unwrap();
        let mut driver = ManualDriver::at_fps(10, 300);
        for _ in 0..299 {
            engine.tick_at(driver.next_frame().unwrap());
        }
        assert_eq!(engine.state().performance_level, QualityTier::Medium);
        assert_eq!(engine.performance_info().detection_interval, 3);

        engine.tick_at(driver.next_frame().unwrap());
        let info = engine.performance_info();
        assert_eq!(info.performance_level, QualityTier::Low);
        assert_eq!(info.detection_interval, 10);
        assert_eq!(info.scene.unwrap().renderer_size, (240, 180));
    }

    #[test]
    fn screenshot_is_delivered_as_png() {
        let (mut engine, rx) = engine(scripted(vec![]));
        assert!(engine.take_screenshot().is_err());
        engine.start().unwrap();
        engine.tick();
        rx.try_iter().for_each(drop);

        engine.take_screenshot().unwrap();
        let events: Vec<UiEvent> = rx.try_iter().collect();
        let (name, png) = events
            .iter()
            .find_map(|e| match e {
                UiEvent::Screenshot { file_name, png } => Some((file_name.clone(), png.clone())),
                _ => None,
            })
            .unwrap();
        assert!(name.starts_with("ar-door-") && name.ends_with(".png"));
        assert_eq!(&png[..4], b"\x89PNG");
        assert!(events.contains(&UiEvent::Hint {
            text: HINT_SCREENSHOT_SAVED.to_string(),
            duration: Duration::from_millis(2000),
        }));
    }

    #[test]
    fn model_selection_while_idle_applies_on_start() {
        let (mut engine, _rx) = engine(scripted(vec![]));
        engine.select_model("door_glass").unwrap();
        assert!(matches!(
            engine.select_model("door_x"),
            Err(EngineError::Asset(_))
        ));
        engine.start().unwrap();
        assert_eq!(
            engine.surface().and_then(|s| s.attached_style()),
            Some(DoorStyle::Glass)
        );
    }

    #[test]
    fn hiding_the_view_stops_the_engine() {
        let (mut engine, _rx) = engine(scripted(vec![]));
        assert!(engine.handle(EngineCommand::Start));
        assert!(engine.handle(EngineCommand::VisibilityChanged { hidden: true }));
        assert!(!engine.is_running());
        assert!(!engine.handle(EngineCommand::Shutdown));
    }

    #[test]
    fn run_stops_when_driver_ends() {
        let (mut engine, _rx) = engine(scripted(vec![]));
        let (tx, commands) = mpsc::channel();
        tx.send(EngineCommand::Start).unwrap();
        let mut driver = ManualDriver::at_fps(30, 5);
        engine.run(&mut driver, &commands);
        assert!(!engine.is_running());
        assert!(!engine.holds_resources());
    }
}
