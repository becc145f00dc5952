//! doorway_demo - run the doorway AR pipeline headless against a capture device

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use doorway_ar::engine::{FrameDriver, IntervalDriver};
use doorway_ar::ui::{ConsoleUi, UiMode};
use doorway_ar::{AppContext, ArConfig, DoorStyle, EngineCommand, HeadlessPlatform};

#[derive(Parser, Debug)]
#[command(
    name = "doorway_demo",
    about = "Detect doorways in a camera feed and anchor a virtual door over them"
)]
struct Args {
    /// Config file (TOML). Falls back to AR_CONFIG.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Frames to run before stopping (0 runs until Ctrl-C).
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// Target frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Capture device, e.g. stub://camera or /dev/video0.
    #[arg(long)]
    device: Option<String>,

    /// Door model id (door_classic, door_modern, door_glass).
    #[arg(long)]
    model: Option<String>,

    /// Directory for a screenshot taken before the session ends.
    #[arg(long, value_name = "DIR")]
    screenshot_out: Option<PathBuf>,

    /// Run without object detection.
    #[arg(long)]
    no_detection: bool,

    /// Seed for the simulated detector.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// ONNX detection model (SSD-style outputs).
    #[cfg(feature = "backend-tract")]
    #[arg(long, value_name = "PATH", requires = "labels")]
    onnx_model: Option<PathBuf>,

    /// Class labels for --onnx-model, one per line.
    #[cfg(feature = "backend-tract")]
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Print the final performance summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ArConfig::load_from(path)?,
        None => ArConfig::load()?,
    };
    if let Some(device) = &args.device {
        config.camera.device = device.clone();
    }
    if let Some(model) = &args.model {
        config.models.default_model = model.parse::<DoorStyle>()?;
    }

    let platform = build_platform(&args);
    let is_tty = std::io::stderr().is_terminal();
    let mut ui = ConsoleUi::new(UiMode::from_flag(Some(&args.ui)), is_tty);
    if let Some(dir) = &args.screenshot_out {
        std::fs::create_dir_all(dir)?;
        ui = ui.with_screenshot_dir(dir);
    }

    log::info!(
        "doorway_demo {} (device {}, model {})",
        env!("CARGO_PKG_VERSION"),
        config.camera.device,
        config.models.default_model
    );
    let mut app = AppContext::new(config, Box::new(platform), Box::new(ui));

    let commands = app.sender();
    ctrlc::set_handler(move || {
        let _ = commands.send(EngineCommand::Shutdown);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    app.engine_mut().start()?;

    let mut driver = IntervalDriver::new(args.fps);
    if args.frames > 0 {
        driver = driver.with_frame_limit(args.frames);
    }
    let mut summary = None;
    while app.pump() && app.engine().is_running() {
        let Some(now) = driver.next_frame() else {
            break;
        };
        app.engine_mut().tick_at(now);
        let engine = app.engine();
        summary = Some((engine.status(), engine.performance_info()));
    }
    if args.screenshot_out.is_some() && app.engine().is_running() {
        if let Err(err) = app.engine_mut().take_screenshot() {
            log::warn!("{}", err);
        }
    }
    app.engine_mut().stop();

    let Some((status, info)) = summary else {
        return Ok(());
    };
    if args.json {
        let summary = serde_json::json!({
            "frames": status.frame_count,
            "fps": info.fps,
            "performance_level": info.performance_level.as_str(),
            "detection_interval": info.detection_interval,
            "camera_resolution": info.camera_resolution,
            "detector_ready": status.detector_ready,
            "door_model": info.scene.as_ref().and_then(|s| s.door_style).map(|s| s.id()),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "doorway_demo: {} frames, {} fps, tier {}",
            status.frame_count, info.fps, info.performance_level
        );
    }
    Ok(())
}

fn build_platform(args: &Args) -> HeadlessPlatform {
    if args.no_detection {
        return HeadlessPlatform::without_detection();
    }
    #[cfg(feature = "backend-tract")]
    if let (Some(model), Some(labels)) = (&args.onnx_model, &args.labels) {
        use doorway_ar::detect::backends::TractLoader;
        use std::sync::Arc;
        return HeadlessPlatform::with_loader(Arc::new(TractLoader::new(model, labels, 300)));
    }
    HeadlessPlatform::new(args.seed)
}
