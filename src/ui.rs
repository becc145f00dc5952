//! UI boundary: what the engine tells the user.
//!
//! The engine only talks to a `UiBoundary`. `ConsoleUi` renders to the log and
//! a terminal spinner; `ChannelUi` forwards typed events to another thread.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::scene::DoorStyle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Loading,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Start,
    Ar,
}

/// Calls from the engine to the user interface.
pub trait UiBoundary: Send {
    fn set_status(&mut self, text: &str, kind: StatusKind);
    fn show_hint(&mut self, text: &str, duration: Duration);
    fn hide_hint(&mut self);
    fn update_fps(&mut self, fps: u32);
    /// Blocking error dialog.
    fn show_error(&mut self, message: &str);
    fn show_loading(&mut self, message: &str);
    fn hide_loading(&mut self);
    fn set_screen(&mut self, screen: Screen);
    fn model_selected(&mut self, style: DoorStyle);
    /// Encoded PNG plus a suggested file name.
    fn deliver_screenshot(&mut self, file_name: &str, png: Vec<u8>);
}

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

/// Terminal front end. Status lines go to the log; the loading modal is a spinner.
pub struct ConsoleUi {
    mode: UiMode,
    is_tty: bool,
    status: Option<(String, StatusKind)>,
    loading: Option<LoadingGuard>,
    screenshot_dir: Option<PathBuf>,
}

impl ConsoleUi {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self {
            mode,
            is_tty,
            status: None,
            loading: None,
            screenshot_dir: None,
        }
    }

    /// Write delivered screenshots into `dir`.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty | UiMode::Auto => true,
                UiMode::Plain => false,
            }
    }
}

impl UiBoundary for ConsoleUi {
    fn set_status(&mut self, text: &str, kind: StatusKind) {
        // The engine repeats status every sampled frame; only log changes.
        if self
            .status
            .as_ref()
            .is_some_and(|(t, k)| t == text && *k == kind)
        {
            return;
        }
        match kind {
            StatusKind::Warning => log::warn!("status: {}", text),
            StatusKind::Error => log::error!("status: {}", text),
            _ => log::info!("status: {}", text),
        }
        self.status = Some((text.to_string(), kind));
    }

    fn show_hint(&mut self, text: &str, duration: Duration) {
        log::info!("hint ({}ms): {}", duration.as_millis(), text);
    }

    fn hide_hint(&mut self) {
        log::debug!("hint hidden");
    }

    fn update_fps(&mut self, fps: u32) {
        log::info!("fps: {}", fps);
    }

    fn show_error(&mut self, message: &str) {
        self.hide_loading();
        log::error!("{}", message);
    }

    fn show_loading(&mut self, message: &str) {
        // Replacing the guard finishes the previous stage.
        self.loading = Some(LoadingGuard::start(message, self.use_pretty()));
    }

    fn hide_loading(&mut self) {
        self.loading = None;
    }

    fn set_screen(&mut self, screen: Screen) {
        log::debug!("screen: {:?}", screen);
    }

    fn model_selected(&mut self, style: DoorStyle) {
        log::info!("door model: {}", style);
    }

    fn deliver_screenshot(&mut self, file_name: &str, png: Vec<u8>) {
        let Some(dir) = &self.screenshot_dir else {
            log::info!("screenshot {} ({} bytes) not saved", file_name, png.len());
            return;
        };
        let path = dir.join(file_name);
        match std::fs::write(&path, &png) {
            Ok(()) => log::info!("screenshot saved to {}", path.display()),
            Err(e) => log::error!("failed to write {}: {}", path.display(), e),
        }
    }
}

struct LoadingGuard {
    message: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl LoadingGuard {
    fn start(message: &str, pretty: bool) -> Self {
        let spinner = if pretty {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(message.to_string());
            Some(spinner)
        } else {
            log::info!("{}", message);
            None
        };
        Self {
            message: message.to_string(),
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let done = format!("✔ {} ({})", self.message, format_duration(self.start.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(done),
            None => log::debug!("{}", done),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// One `UiBoundary` call as a message.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Status { text: String, kind: StatusKind },
    Hint { text: String, duration: Duration },
    HideHint,
    Fps(u32),
    Error(String),
    Loading(String),
    LoadingDone,
    Screen(Screen),
    ModelSelected(DoorStyle),
    Screenshot { file_name: String, png: Vec<u8> },
}

/// Forwards every call as a `UiEvent`. A dropped receiver is ignored.
pub struct ChannelUi {
    tx: Sender<UiEvent>,
}

impl ChannelUi {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

impl UiBoundary for ChannelUi {
    fn set_status(&mut self, text: &str, kind: StatusKind) {
        self.send(UiEvent::Status {
            text: text.to_string(),
            kind,
        });
    }

    fn show_hint(&mut self, text: &str, duration: Duration) {
        self.send(UiEvent::Hint {
            text: text.to_string(),
            duration,
        });
    }

    fn hide_hint(&mut self) {
        self.send(UiEvent::HideHint);
    }

    fn update_fps(&mut self, fps: u32) {
        self.send(UiEvent::Fps(fps));
    }

    fn show_error(&mut self, message: &str) {
        self.send(UiEvent::Error(message.to_string()));
    }

    fn show_loading(&mut self, message: &str) {
        self.send(UiEvent::Loading(message.to_string()));
    }

    fn hide_loading(&mut self) {
        self.send(UiEvent::LoadingDone);
    }

    fn set_screen(&mut self, screen: Screen) {
        self.send(UiEvent::Screen(screen));
    }

    fn model_selected(&mut self, style: DoorStyle) {
        self.send(UiEvent::ModelSelected(style));
    }

    fn deliver_screenshot(&mut self, file_name: &str, png: Vec<u8>) {
        self.send(UiEvent::Screenshot {
            file_name: file_name.to_string(),
            png,
        });
    }
}
