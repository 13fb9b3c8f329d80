pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("quad geometry is degenerate: {0}")]
    DegenerateQuad(#[from] doc_geometry::Error),
    #[error("source image dimensions do not match the frame passed to the rectifier")]
    DimensionMismatch,
    #[error("computed output rectangle has a zero or negative dimension")]
    DegenerateOutputRectangle,
}
