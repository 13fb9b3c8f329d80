mod directional_gradient;
mod strategies;

pub use strategies::run_strategy;

use doc_types::{Chroma, Strategy};

use crate::imageops::GrayImage;

/// A frame's channel data as seen by the preprocessing strategies: always
/// luminance, optionally RGB-ish chroma at the same resolution.
pub struct StrategyInput<'a> {
    pub luma: &'a GrayImage,
    pub chroma: Option<Chroma<'a>>,
}

/// Binary edge map produced by a strategy: same dimensions as the input,
/// values in {0, 255}.
pub type EdgeMap = GrayImage;
