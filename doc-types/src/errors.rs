pub type Result<T> = std::result::Result<T, Error>;

/// The taxonomy from the error-handling design: only the capture boundary
/// ever surfaces one of these to a caller. The detector, ranker and
/// tracker recover locally instead of returning `Err`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("frame has zero width or height")]
    ZeroDimensionFrame,
    #[error("unsupported frame format: {0}")]
    UnsupportedFrameFormat(String),
    #[error("camera returned no frame for capture")]
    CaptureNoFrame,
    #[error("rectification numerics degenerate: {0}")]
    DegenerateRectification(#[from] doc_geometry::Error),
    #[error("configuration could not be parsed: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("tracker invariant violated: {0}")]
    TrackerInvariant(String),
}
