use crate::scene::DoorStyle;

/// Messages from the UI boundary to the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    Start,
    Stop,
    TakeScreenshot,
    /// Style id such as `door_modern`; unknown ids are reported, not fatal.
    SelectModel(String),
    Resize { width: u32, height: u32 },
    /// Hiding the view stops the engine.
    VisibilityChanged { hidden: bool },
    Shutdown,
}

impl EngineCommand {
    pub fn select(style: DoorStyle) -> Self {
        EngineCommand::SelectModel(style.id().to_string())
    }
}
