use doc_geometry::Quad;

/// One per-frame detection result, before the confidence gate is applied.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub quad: Quad,
    pub confidence: f64,
    pub timing_ms: f64,
    pub is_partial_document: bool,
}

/// The confidence-gated sum type callers actually consume, replacing a
/// nullable detection result with a tagged alternative per the three-tier
/// gate: suppressed below 0.35, manual-review candidate in [0.35, 0.65),
/// eligible for auto-capture at or above 0.65.
#[derive(Debug, Clone, Copy)]
pub enum DetectionOutcome {
    NoDetection,
    LowConfidence(Detection),
    HighConfidence(Detection),
}

pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.35;
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.65;

impl DetectionOutcome {
    /// Apply the confidence gate to a raw detection (or its absence).
    pub fn gate(detection: Option<Detection>) -> Self {
        match detection {
            None => DetectionOutcome::NoDetection,
            Some(d) if d.confidence < LOW_CONFIDENCE_THRESHOLD => DetectionOutcome::NoDetection,
            Some(d) if d.confidence < HIGH_CONFIDENCE_THRESHOLD => {
                DetectionOutcome::LowConfidence(d)
            }
            Some(d) => DetectionOutcome::HighConfidence(d),
        }
    }

    pub fn detection(&self) -> Option<&Detection> {
        match self {
            DetectionOutcome::NoDetection => None,
            DetectionOutcome::LowConfidence(d) | DetectionOutcome::HighConfidence(d) => Some(d),
        }
    }

    pub fn is_eligible_for_auto_capture(&self) -> bool {
        matches!(self, DetectionOutcome::HighConfidence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_geometry::Point;

    fn sample_quad() -> Quad {
        Quad::new(
            Point::new(150.0, 50.0),
            Point::new(650.0, 50.0),
            Point::new(650.0, 550.0),
            Point::new(150.0, 550.0),
            600.0,
        )
        .unwrap()
    }

    #[test]
    fn confidence_below_threshold_is_suppressed() {
        let d = Detection {
            quad: sample_quad(),
            confidence: 0.2,
            timing_ms: 5.0,
            is_partial_document: false,
        };
        assert!(matches!(DetectionOutcome::gate(Some(d)), DetectionOutcome::NoDetection));
    }

    #[test]
    fn confidence_in_manual_review_band() {
        let d = Detection {
            quad: sample_quad(),
            confidence: 0.5,
            timing_ms: 5.0,
            is_partial_document: false,
        };
        let outcome = DetectionOutcome::gate(Some(d));
        assert!(matches!(outcome, DetectionOutcome::LowConfidence(_)));
        assert!(!outcome.is_eligible_for_auto_capture());
    }

    #[test]
    fn confidence_at_high_threshold_is_eligible() {
        let d = Detection {
            quad: sample_quad(),
            confidence: 0.65,
            timing_ms: 5.0,
            is_partial_document: false,
        };
        let outcome = DetectionOutcome::gate(Some(d));
        assert!(outcome.is_eligible_for_auto_capture());
    }
}
