//! Shared data model for the document-localization pipeline: frames,
//! detections, scene descriptors, configuration and per-stage latency
//! tracking. Geometric primitives (`Point`, `Quad`, `Homography`) live in
//! `doc-geometry` and are re-exported here for convenience.

pub mod config;
pub mod detection;
pub mod errors;
pub mod frame;
pub mod histogram;
pub mod scene;

pub use config::Config;
pub use detection::{Detection, DetectionOutcome, HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD};
pub use doc_geometry::{Homography, Point, Quad};
pub use errors::{Error, Result};
pub use frame::{Chroma, Frame, OwnedLumaFrame, Rotation};
pub use histogram::LatencyHistogram;
pub use scene::{SceneDescriptor, Strategy};
