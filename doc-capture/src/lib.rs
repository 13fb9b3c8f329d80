pub mod analyzer_context;
pub mod camera_control;
pub mod capture_state;
pub mod errors;
pub mod frame_source;
pub mod logging;

pub use analyzer_context::{AnalyzerContext, DetectionStreamEntry};
pub use camera_control::{CameraControl, RegionOfInterest};
pub use capture_state::CaptureState;
pub use errors::{Error, Result};
pub use frame_source::{FrameSource, LatestFrameQueue};
