pub type Result<T> = std::result::Result<T, Error>;

/// Errors that cross the capture-path boundary. Per the detector/ranker/
/// tracker propagation policy, only this crate ever surfaces an `Error`;
/// everything upstream recovers locally instead.
#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
    #[error("camera returned no frame for the capture request")]
    NoFrameReturned,
    #[error("frame decode failed: {0}")]
    DecodeFailed(String),
    #[error("rectification numerics degenerated: {0}")]
    RectificationFailed(String),
    #[error("autofocus lock request timed out")]
    AfLockTimeout,
    #[error("capture request timed out")]
    CaptureTimeout,
}

impl From<doc_rectify::Error> for Error {
    fn from(e: doc_rectify::Error) -> Self {
        Error::RectificationFailed(e.to_string())
    }
}
