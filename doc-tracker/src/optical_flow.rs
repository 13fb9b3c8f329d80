use doc_geometry::{Point, Quad};
use doc_types::OwnedLumaFrame;

use crate::lucas_kanade::track;

/// Per-point tracking error above which a corner is considered lost.
const ERROR_CAP: f64 = 12.0;
/// Correction interval: full detection runs every this-many frames while
/// tracking.
const CORRECTION_INTERVAL: u32 = 3;
/// Mean per-corner distance (px) between detected and tracked corners
/// above which a correction frame forces a reset to detection.
const CORRECTION_DIVERGENCE_PX: f64 = 8.0;
const MIN_TRACKED_AREA_PX2: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    DetectOnly,
    Tracking,
}

/// Tracks the four document corners between frames with the assistance
/// of sparse optical flow, letting the full detector run less often
/// during steady viewing (spec §4.6.2).
pub struct OpticalFlowTracker {
    mode: Mode,
    previous_frame: Option<OwnedLumaFrame>,
    corners: Option<[Point; 4]>,
    frames_in_session: u32,
}

impl Default for OpticalFlowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OpticalFlowTracker {
    pub fn new() -> Self {
        Self {
            mode: Mode::DetectOnly,
            previous_frame: None,
            corners: None,
            frames_in_session: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.mode = Mode::DetectOnly;
        self.previous_frame = None;
        self.corners = None;
        self.frames_in_session = 0;
    }

    /// Whether, on this frame, the full detector must run regardless of
    /// tracking state (always true in DETECT_ONLY; every `CORRECTION_INTERVAL`
    /// frames while TRACKING).
    pub fn should_run_full_detection(&self) -> bool {
        match self.mode {
            Mode::DetectOnly => true,
            Mode::Tracking => self.frames_in_session % CORRECTION_INTERVAL == 0,
        }
    }

    /// Advance the tracker by one frame. `detection` is the full
    /// detector's output this frame, if it ran (per
    /// `should_run_full_detection`).
    ///
    /// Returns the tracked (or freshly detected) quad, if any.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn advance(
        &mut self,
        current_frame: &OwnedLumaFrame,
        detection: Option<(Quad, f64)>,
    ) -> Option<Quad> {
        if let Some(prev) = &self.previous_frame {
            if prev.width != current_frame.width || prev.height != current_frame.height {
                self.reset();
            }
        }

        match self.mode {
            Mode::DetectOnly => self.advance_detect_only(current_frame, detection),
            Mode::Tracking => self.advance_tracking(current_frame, detection),
        }
    }

    fn advance_detect_only(&mut self, current_frame: &OwnedLumaFrame, detection: Option<(Quad, f64)>) -> Option<Quad> {
        self.previous_frame = Some(current_frame.clone());
        let (quad, confidence) = detection?;
        if confidence >= 0.65 {
            self.mode = Mode::Tracking;
            self.corners = Some(quad.corners());
            self.frames_in_session = 1;
        }
        Some(quad)
    }

    fn advance_tracking(&mut self, current_frame: &OwnedLumaFrame, detection: Option<(Quad, f64)>) -> Option<Quad> {
        let Some(prev_frame) = self.previous_frame.take() else {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        };
        let Some(prev_corners) = self.corners else {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        };

        let tracked = track(&prev_frame.luma, &current_frame.luma, current_frame.width as usize, current_frame.height as usize, &prev_corners);

        if tracked.iter().any(|t| t.lost || t.error > ERROR_CAP) {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        }

        let positions: [Point; 4] = [
            tracked[0].position,
            tracked[1].position,
            tracked[2].position,
            tracked[3].position,
        ];
        let (w, h) = (current_frame.width as f64, current_frame.height as f64);
        if positions.iter().any(|p| p.x < 0.0 || p.y < 0.0 || p.x >= w || p.y >= h) {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        }

        let shorter_side = w.min(h);
        let Ok(tracked_quad) = Quad::from_unordered(positions, shorter_side) else {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        };
        if tracked_quad.area() < MIN_TRACKED_AREA_PX2 {
            self.reset();
            return self.advance_detect_only(current_frame, detection);
        }

        self.frames_in_session += 1;
        self.previous_frame = Some(current_frame.clone());

        // The caller only passes `Some` on a correction frame (it decides
        // via `should_run_full_detection` before running the detector), so
        // any detection handed to us here is always due for reconciliation.
        if let Some((detected_quad, _)) = detection {
            let divergence = tracked_quad.mean_corner_distance(&detected_quad);
            if divergence > CORRECTION_DIVERGENCE_PX {
                self.reset();
                self.previous_frame = Some(current_frame.clone());
                return Some(detected_quad);
            }
            self.corners = Some(detected_quad.corners());
            return Some(detected_quad);
        }

        self.corners = Some(tracked_quad.corners());
        Some(tracked_quad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn transitions_to_tracking_on_high_confidence() {
        let mut tracker = OpticalFlowTracker::new();
        let frame = frame_with_document(320, 240);
        let quad = quad_for(320, 240);
        tracker.advance(&frame, Some((quad, 0.8)));
        assert_eq!(tracker.mode(), Mode::Tracking);
    }

    #[test]
    fn stays_detect_only_below_confidence_threshold() {
        let mut tracker = OpticalFlowTracker::new();
        let frame = frame_with_document(320, 240);
        let quad = quad_for(320, 240);
        tracker.advance(&frame, Some((quad, 0.4)));
        assert_eq!(tracker.mode(), Mode::DetectOnly);
    }

    #[test]
    fn resets_to_detect_only_on_dimension_change() {
        let mut tracker = OpticalFlowTracker::new();
        let frame = frame_with_document(320, 240);
        let quad = quad_for(320, 240);
        tracker.advance(&frame, Some((quad, 0.8)));
        assert_eq!(tracker.mode(), Mode::Tracking);

        let resized = frame_with_document(160, 120);
        tracker.advance(&resized, None);
        assert_eq!(tracker.mode(), Mode::DetectOnly);
    }

    #[test]
    fn correction_interval_matches_every_third_frame() {
        let tracker = OpticalFlowTracker::new();
        assert!(tracker.should_run_full_detection());
    }
}
