pub mod scripted;
pub mod simulated;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::{ScriptedDetector, ScriptedLoader};
pub use simulated::{SimulatedDetector, SimulatedLoader};

#[cfg(feature = "backend-tract")]
pub use tract::{TractDetector, TractLoader};
