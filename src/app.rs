//! Application wiring: a concrete `Platform` and the context that owns the
//! engine plus its command channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use anyhow::Result;

use crate::config::{ArConfig, CameraSettings, RenderSettings};
use crate::detect::{DetectorLoader, SimulatedLoader};
use crate::engine::{Engine, EngineCommand, FrameDriver, Platform};
use crate::ingest::{self, CaptureDevice};
use crate::render::{GraphicsBackend, HeadlessRenderer};
use crate::scene::{DoorGenerator, ProceduralDoors};
use crate::ui::UiBoundary;

/// Platform backed by the configured capture device, the software renderer
/// and procedural door geometry.
pub struct HeadlessPlatform {
    loader: Option<Arc<dyn DetectorLoader>>,
}

impl HeadlessPlatform {
    /// Simulated detector seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_loader(Arc::new(SimulatedLoader::new(seed)))
    }

    pub fn with_loader(loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            loader: Some(loader),
        }
    }

    /// Run with detection disabled.
    pub fn without_detection() -> Self {
        Self { loader: None }
    }
}

impl Platform for HeadlessPlatform {
    fn open_camera(&mut self, settings: &CameraSettings) -> Result<Box<dyn CaptureDevice>> {
        ingest::open_device(&settings.device)
    }

    fn detector_loader(&mut self) -> Option<Arc<dyn DetectorLoader>> {
        self.loader.clone()
    }

    fn create_graphics(&mut self, _settings: &RenderSettings) -> Result<Box<dyn GraphicsBackend>> {
        Ok(Box::new(HeadlessRenderer::new()))
    }

    fn door_generator(&mut self) -> Box<dyn DoorGenerator> {
        Box::new(ProceduralDoors)
    }
}

/// Engine plus the channel the UI side sends commands on.
pub struct AppContext {
    engine: Engine,
    commands: Sender<EngineCommand>,
    inbox: Receiver<EngineCommand>,
}

impl AppContext {
    pub fn new(config: ArConfig, platform: Box<dyn Platform>, ui: Box<dyn UiBoundary>) -> Self {
        let (commands, inbox) = mpsc::channel();
        Self {
            engine: Engine::new(config, platform, ui),
            commands,
            inbox,
        }
    }

    /// A sender for UI threads and signal handlers.
    pub fn sender(&self) -> Sender<EngineCommand> {
        self.commands.clone()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Apply every queued command without blocking. Returns false after `Shutdown`.
    pub fn pump(&mut self) -> bool {
        while let Ok(command) = self.inbox.try_recv() {
            if !self.engine.handle(command) {
                return false;
            }
        }
        true
    }

    /// Process queued commands and frames until `Shutdown`, until `driver`
    /// ends, or until the engine is idle with nothing left in the queue.
    ///
    /// The context holds a sender of its own, so the channel never closes;
    /// a `Start` that fails therefore ends the run instead of waiting.
    pub fn run(&mut self, driver: &mut dyn FrameDriver) {
        loop {
            if !self.pump() || !self.engine.is_running() {
                return;
            }
            match driver.next_frame() {
                Some(now) => self.engine.tick_at(now),
                None => {
                    log::info!(
                        "frame driver finished after {} frames",
                        self.engine.state().frame_count
                    );
                    self.engine.stop();
                    return;
                }
            }
        }
    }
}
