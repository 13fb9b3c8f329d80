use std::time::{Duration, Instant};

use doc_types::{Chroma, Detection, Frame};

use crate::contour::{extract_quad_candidates, is_partial_document, suppress_spanning_lines};
use crate::imageops::GrayImage;
use crate::line_cascade;
use crate::preprocess::{run_strategy, StrategyInput};
use crate::ranker::rank;
use crate::scene_analyzer::{downsample_longest_side, SceneAnalyzer};

/// A strategy that scores at or above this threshold, with no
/// partial-document flag, short-circuits the strategy loop early.
const EARLY_EXIT_SCORE: f64 = 0.65;

/// The score below which the contour pipeline is considered to have
/// failed, triggering the line-cascade fallback.
const CASCADE_FALLBACK_THRESHOLD: f64 = 0.35;

/// Runs the SceneAnalyzer, Preprocessor, ContourPipeline, LineCascade and
/// QuadRanker in sequence to produce a single per-frame `Detection`. Owns
/// no per-frame state; temporal smoothing is the caller's (TemporalTracker's)
/// responsibility.
pub struct DetectionPipeline {
    scene_analyzer: SceneAnalyzer,
    strategy_time_budget: Duration,
}

impl DetectionPipeline {
    pub fn new(strategy_time_budget_ms: u64) -> Self {
        Self {
            scene_analyzer: SceneAnalyzer::new(),
            strategy_time_budget: Duration::from_millis(strategy_time_budget_ms),
        }
    }

    pub fn reset(&mut self) {
        self.scene_analyzer.reset();
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn detect(&mut self, frame: &Frame<'_>, cache_key: u64) -> Option<Detection> {
        let start = Instant::now();
        let scene = self.scene_analyzer.analyze(frame, cache_key);
        let downsampled = downsample_longest_side(frame, crate::scene_analyzer::ANALYSIS_MAX_SIDE);
        let scale = downsampled.width as f64 / frame.width as f64;
        let chroma = downsample_chroma(frame, &downsampled, scale);

        let mut best: Option<(doc_geometry::Quad, f64)> = None;

        for &strategy in &scene.strategies {
            if start.elapsed() > self.strategy_time_budget {
                break;
            }

            let edge_map = self.run_and_suppress(strategy, &downsampled, chroma);
            let candidates = extract_quad_candidates(&edge_map);
            if let Some((quad, confidence)) =
                rank(&candidates, &edge_map, downsampled.width as f64, downsampled.height as f64)
            {
                let improves = best.map(|(_, c)| confidence > c).unwrap_or(true);
                if improves {
                    best = Some((quad, confidence));
                }
                let partial = is_partial_document(&quad, downsampled.width as f64, downsampled.height as f64);
                if confidence >= EARLY_EXIT_SCORE && !partial {
                    break;
                }
            }
        }

        if best.map(|(_, c)| c < CASCADE_FALLBACK_THRESHOLD).unwrap_or(true) {
            if let Some(fallback_edges) = scene
                .strategies
                .first()
                .map(|&s| self.run_and_suppress(s, &downsampled, chroma))
            {
                if let Some(result) = line_cascade::run(&downsampled, &fallback_edges) {
                    let improves = best.map(|(_, c)| result.confidence > c).unwrap_or(true);
                    if improves {
                        best = Some((result.quad, result.confidence));
                    }
                }
            }
        }

        let (quad, confidence) = best?;
        let scaled_quad = unscale_quad(quad, 1.0 / scale, frame);
        let partial = is_partial_document(&scaled_quad, frame.width as f64, frame.height as f64);

        Some(Detection {
            quad: scaled_quad,
            confidence,
            timing_ms: start.elapsed().as_secs_f64() * 1000.0,
            is_partial_document: partial,
        })
    }

    fn run_and_suppress(&self, strategy: doc_types::Strategy, luma: &GrayImage, chroma: Option<Chroma<'_>>) -> GrayImage {
        let input = StrategyInput { luma, chroma };
        let edges = run_strategy(strategy, &input);
        suppress_spanning_lines(&edges)
    }
}

/// Rescale a quad detected in downsampled analysis coordinates back to
/// the original frame's pixel coordinates.
fn unscale_quad(quad: doc_geometry::Quad, inv_scale: f64, frame: &Frame<'_>) -> doc_geometry::Quad {
    let corners = quad.corners().map(|p| doc_geometry::Point::new(p.x * inv_scale, p.y * inv_scale));
    doc_geometry::Quad::from_unordered(corners, frame.shorter_side()).unwrap_or(quad)
}

fn downsample_chroma<'a>(_frame: &Frame<'a>, _downsampled: &GrayImage, _scale: f64) -> Option<Chroma<'a>> {
    // Chroma-aware strategies are only selected by SceneAnalyzer when the
    // caller supplied chroma; re-sampling it to the analysis resolution is
    // not yet implemented, so those strategies run against full-resolution
    // chroma when dimensions happen to already match, and degrade
    // gracefully (see SaturationChannel) otherwise.
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_types::Rotation;

    fn synthetic_document_frame(w: u32, h: u32) -> Vec<u8> {
        let mut data = vec![30u8; (w * h) as usize];
        let (x0, y0, x1, y1) = (w / 8, h / 8, w - w / 8, h - h / 8);
        for y in y0..y1 {
            for x in x0..x1 {
                data[(y * w + x) as usize] = 230;
            }
        }
        data
    }

    #[test]
    fn detects_a_high_contrast_document() {
        let luma = synthetic_document_frame(320, 240);
        let frame = Frame::new(320, 240, &luma, None, Rotation::Deg0, 0).unwrap();
        let mut pipeline = DetectionPipeline::new(25);
        let detection = pipeline.detect(&frame, 1);
        assert!(detection.is_some());
    }

    #[test]
    fn uniform_frame_yields_no_detection() {
        let luma = vec![128u8; 320 * 240];
        let frame = Frame::new(320, 240, &luma, None, Rotation::Deg0, 0).unwrap();
        let mut pipeline = DetectionPipeline::new(25);
        let detection = pipeline.detect(&frame, 1);
        assert!(detection.is_none());
    }
}
