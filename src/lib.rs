//! Doorway AR
//!
//! A frame pipeline that finds doorway-like objects in a live camera feed and
//! anchors a virtual door model over them.
//!
//! # Architecture
//!
//! Each frame flows `camera -> detection -> placement -> render`:
//!
//! - `ingest`: capture devices and the stream lifecycle (`CameraSource`)
//! - `detect`: detector backends, the doorway filter, smoothing and history
//! - `scene`: the scene graph, procedural door assets and the asset cache
//! - `render`: the render surface, door placement and FPS measurement
//! - `engine`: the orchestrator state machine and adaptive quality tiers
//! - `ui`: the boundary through which the engine reports to the user
//! - `app`: a headless platform and the command channel wiring
//!
//! Everything runs on the thread that drives the engine. Other threads reach
//! it through `EngineCommand` messages.

pub mod app;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod render;
pub mod scene;
pub mod ui;

pub use app::{AppContext, HeadlessPlatform};
pub use config::ArConfig;
pub use engine::{
    Engine, EngineCommand, EngineState, EngineStatus, PerformanceInfo, Phase, Platform,
    QualityTier,
};
pub use error::{AssetError, CameraError, EngineError, EngineResult};
pub use scene::DoorStyle;
