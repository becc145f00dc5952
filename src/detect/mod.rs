mod backend;
pub mod backends;
mod filter;
mod history;
mod result;
mod service;
mod smoothing;

pub use backend::{DetectOptions, DetectorLoader, ObjectDetector};
pub use backends::{ScriptedDetector, ScriptedLoader, SimulatedDetector, SimulatedLoader};
pub use filter::DoorwayFilter;
pub use history::{DetectionHistory, DetectionStats};
pub use result::{BoundingBox, Detection, Point, Prediction};
pub use service::{DetectionService, DetectorInfo, ServiceState};
pub use smoothing::{DetectionSmoother, SmoothingFactors};
