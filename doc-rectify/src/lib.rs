pub mod aspect_ratio;
pub mod corner_refine;
pub mod errors;
pub mod orientation;
pub mod rectifier;
pub mod warp;

pub use aspect_ratio::{AspectRatioEstimate, KnownFormat};
pub use errors::{Error, Result};
pub use rectifier::{rectify, rectify_preview, RectifyOutput};
pub use warp::Interpolation;
