use doc_geometry::Quad;
use doc_types::Rotation;
use image::RgbImage;

/// Capture state stream (spec.md §6): published to consumers as the
/// capture pipeline advances through a request.
#[derive(Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Processing,
    Result {
        original: RgbImage,
        rectified: RgbImage,
        latency_ms: u64,
        confidence: f64,
        corners: Quad,
        auto_rotation_steps: Rotation,
    },
    LowConfidence {
        original: RgbImage,
        corners: Quad,
        confidence: f64,
    },
    Error(String),
}

impl std::fmt::Debug for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Capturing => write!(f, "Capturing"),
            CaptureState::Processing => write!(f, "Processing"),
            CaptureState::Result { confidence, auto_rotation_steps, .. } => f
                .debug_struct("Result")
                .field("confidence", confidence)
                .field("auto_rotation_steps", auto_rotation_steps)
                .finish_non_exhaustive(),
            CaptureState::LowConfidence { confidence, .. } => f
                .debug_struct("LowConfidence")
                .field("confidence", confidence)
                .finish_non_exhaustive(),
            CaptureState::Error(message) => f.debug_tuple("Error").field(message).finish(),
        }
    }
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    pub fn is_terminal_hold(&self) -> bool {
        matches!(self, CaptureState::Error(_))
    }
}
