pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("quad is degenerate: two corners are closer than the minimum separation")]
    DegenerateQuad,
    #[error("quad is not convex")]
    NotConvex,
    #[error("homography is singular and cannot be inverted")]
    SingularHomography,
    #[error("need exactly {expected} point correspondences, got {got}")]
    WrongCorrespondenceCount { expected: usize, got: usize },
}
