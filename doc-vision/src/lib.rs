//! Per-frame document detection: scene classification, multi-strategy
//! preprocessing, contour extraction, the line-cascade fallback detector
//! and quad ranking, composed into a single [`pipeline::DetectionPipeline`].

pub mod contour;
pub mod imageops;
pub mod line_cascade;
pub mod pipeline;
pub mod preprocess;
pub mod ranker;
pub mod scene_analyzer;
pub mod lines;

pub use pipeline::DetectionPipeline;
pub use scene_analyzer::SceneAnalyzer;
