use std::collections::VecDeque;

use doc_geometry::Quad;

/// Ring-buffer depth: up to this many recent detections contribute to the
/// smoothed quad.
pub const BUFFER_SIZE: usize = 5;
/// Consecutive misses after which the buffer is cleared and stability
/// resets.
pub const MISS_THRESHOLD: u32 = 10;
/// Consecutive stable frames required for `isStable` to become true.
pub const STABILITY_THRESHOLD: u32 = 20;
/// Per-corner drift fraction (of bounding-box diagonal) below which a
/// frame counts toward stability.
pub const DRIFT_FRACTION: f64 = 0.025;
/// Per-corner drift fraction above which a new detection is treated as a
/// different document entirely (buffer clear, not just a miss).
pub const JUMP_FRACTION: f64 = 0.10;

/// Averages recent detections and tracks how long the document has held
/// still, per spec §4.6.1.
#[derive(Debug, Default)]
pub struct QuadSmoother {
    quads: VecDeque<Quad>,
    confidences: VecDeque<f64>,
    miss_count: u32,
    stable_count: u32,
    previous_smoothed: Option<Quad>,
    current_smoothed: Option<Quad>,
}

impl QuadSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed in the latest ranked detection (or `None` on a miss) and
    /// return the current smoothed quad, if any.
    pub fn update(&mut self, detection: Option<(Quad, f64)>) -> Option<Quad> {
        let Some((quad, confidence)) = detection else {
            self.miss_count += 1;
            if self.miss_count >= MISS_THRESHOLD {
                self.clear();
                return None;
            }
            return self.current_smoothed;
        };

        self.miss_count = 0;

        if let Some(average) = self.current_smoothed {
            let diagonal = average.bounding_box_diagonal().max(1e-9);
            let drift = average.mean_corner_distance(&quad) / diagonal;
            if drift > JUMP_FRACTION {
                self.clear();
            }
        }

        if self.quads.len() == BUFFER_SIZE {
            self.quads.pop_front();
            self.confidences.pop_front();
        }
        self.quads.push_back(quad);
        self.confidences.push_back(confidence);

        let quads: Vec<Quad> = self.quads.iter().copied().collect();
        let smoothed = Quad::mean(&quads);

        self.previous_smoothed = self.current_smoothed;
        self.current_smoothed = smoothed;
        self.update_stability();

        self.current_smoothed
    }

    fn update_stability(&mut self) {
        let (Some(prev), Some(cur)) = (self.previous_smoothed, self.current_smoothed) else {
            self.stable_count = self.stable_count.max(1);
            return;
        };
        let diagonal = cur.bounding_box_diagonal().max(1e-9);
        let drift = prev.mean_corner_distance(&cur) / diagonal;

        self.stable_count = if drift < DRIFT_FRACTION {
            self.stable_count + 1
        } else if drift < 4.0 * DRIFT_FRACTION {
            (self.stable_count / 2).max(1)
        } else {
            1
        };
    }

    fn clear(&mut self) {
        self.quads.clear();
        self.confidences.clear();
        self.stable_count = 0;
        self.previous_smoothed = None;
        self.current_smoothed = None;
    }

    /// Arithmetic mean of buffered confidences; misses are not added to
    /// the buffer, so this preserves the pre-miss average.
    pub fn average_confidence(&self) -> f64 {
        if self.confidences.is_empty() {
            0.0
        } else {
            self.confidences.iter().sum::<f64>() / self.confidences.len() as f64
        }
    }

    pub fn stability_progress(&self) -> f64 {
        (self.stable_count as f64 / STABILITY_THRESHOLD as f64).min(1.0)
    }

    pub fn is_stable(&self) -> bool {
        self.stable_count >= STABILITY_THRESHOLD
    }

    pub fn current(&self) -> Option<Quad> {
        self.current_smoothed
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_geometry::Point;

    fn quad_at(offset: f64) -> Quad {
        Quad::new(
            Point::new(150.0 + offset, 50.0),
            Point::new(650.0 + offset, 50.0),
            Point::new(650.0 + offset, 550.0),
            Point::new(150.0 + offset, 550.0),
            600.0,
        )
        .unwrap()
    }

    #[test]
    fn stability_monotonically_reaches_threshold_under_identical_input() {
        let mut smoother = QuadSmoother::new();
        for _ in 0..STABILITY_THRESHOLD {
            smoother.update(Some((quad_at(0.0), 0.7)));
        }
        assert!(smoother.is_stable());
    }

    #[test]
    fn miss_threshold_clears_buffer() {
        let mut smoother = QuadSmoother::new();
        smoother.update(Some((quad_at(0.0), 0.7)));
        for _ in 0..MISS_THRESHOLD {
            smoother.update(None);
        }
        assert!(smoother.current().is_none());
        assert_eq!(smoother.stability_progress(), 0.0);
    }

    #[test]
    fn sudden_jump_resets_stability() {
        let mut smoother = QuadSmoother::new();
        for _ in 0..STABILITY_THRESHOLD {
            smoother.update(Some((quad_at(0.0), 0.7)));
        }
        assert!(smoother.is_stable());

        // Shift by 20% of the diagonal, per the pan scenario.
        let diagonal = quad_at(0.0).bounding_box_diagonal();
        smoother.update(Some((quad_at(diagonal * 0.2), 0.7)));
        assert!(smoother.stability_progress() <= 0.05);
    }

    #[test]
    fn miss_frames_do_not_affect_average_confidence() {
        let mut smoother = QuadSmoother::new();
        smoother.update(Some((quad_at(0.0), 0.9)));
        let before = smoother.average_confidence();
        smoother.update(None);
        assert_eq!(smoother.average_confidence(), before);
    }
}
