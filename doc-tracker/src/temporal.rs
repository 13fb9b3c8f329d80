use doc_geometry::Quad;
use doc_types::OwnedLumaFrame;

use crate::adaptive_skip::AdaptiveSkip;
use crate::optical_flow::{Mode, OpticalFlowTracker};
use crate::smoother::QuadSmoother;

/// The single temporal-tracking component the rest of the pipeline
/// consumes: combines detection smoothing, optical-flow-assisted corner
/// tracking and adaptive miss-driven backoff (spec §4.6).
#[derive(Default)]
pub struct TemporalTracker {
    smoother: QuadSmoother,
    flow: OpticalFlowTracker,
    skip: AdaptiveSkip,
}

/// What the caller should do this frame.
pub enum FrameAction {
    /// Run the full detector and feed its result back via `observe`.
    RunDetection,
    /// Reuse the last reported result without running the detector.
    Skip,
}

impl TemporalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.smoother = QuadSmoother::new();
        self.flow = OpticalFlowTracker::new();
        self.skip = AdaptiveSkip::new();
    }

    /// Decide whether the caller should run full detection this frame.
    /// While tracking, the optical-flow correction interval governs;
    /// otherwise the adaptive miss-driven backoff does.
    pub fn next_action(&mut self) -> FrameAction {
        let must_run = match self.flow.mode() {
            Mode::Tracking => self.flow.should_run_full_detection(),
            Mode::DetectOnly => self.skip.should_detect(self.smoother.miss_count()),
        };
        if must_run {
            FrameAction::RunDetection
        } else {
            FrameAction::Skip
        }
    }

    /// Feed this frame's observation (a fresh detection, if one ran) and
    /// return the current tracked/smoothed quad.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn observe(
        &mut self,
        current_frame: &OwnedLumaFrame,
        detection: Option<(Quad, f64)>,
    ) -> Option<Quad> {
        let smoothed = self.smoother.update(detection);
        let tracked = self.flow.advance(current_frame, detection);
        if self.smoother.miss_count() == 0 {
            self.skip.reset();
        }
        tracked.or(smoothed)
    }

    pub fn is_stable(&self) -> bool {
        self.smoother.is_stable()
    }

    pub fn stability_progress(&self) -> f64 {
        self.smoother.stability_progress()
    }

    pub fn average_confidence(&self) -> f64 {
        self.smoother.average_confidence()
    }

    pub fn is_tracking(&self) -> bool {
        self.flow.mode() == Mode::Tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_geometry::Point;

    fn frame_with_document(w: u32, h: u32) -> OwnedLumaFrame {
        let mut data = vec![20u8; (w * h) as usize];
        for y in (h / 8)..(h - h / 8) {
            for x in (w / 8)..(w - w / 8) {
                data[(y * w + x) as usize] = 230;
            }
        }
        OwnedLumaFrame { width: w, height: h, luma: data }
    }

    fn quad_for(w: u32, h: u32) -> Quad {
        Quad::new(
            Point::new((w / 8) as f64, (h / 8) as f64),
            Point::new((w - w / 8) as f64, (h / 8) as f64),
            Point::new((w - w / 8) as f64, (h - h / 8) as f64),
            Point::new((w / 8) as f64, (h - h / 8) as f64),
            w.min(h) as f64,
        )
        .unwrap()
    }

    #[test]
    fn builds_stability_over_repeated_confident_detections() {
        let mut tracker = TemporalTracker::new();
        let frame = frame_with_document(320, 240);
        let quad = quad_for(320, 240);
        for _ in 0..crate::smoother::STABILITY_THRESHOLD {
            tracker.observe(&frame, Some((quad, 0.8)));
        }
        assert!(tracker.is_stable());
    }

    #[test]
    fn detection_always_required_while_detect_only() {
        let mut tracker = TemporalTracker::new();
        assert!(matches!(tracker.next_action(), FrameAction::RunDetection));
    }
}
