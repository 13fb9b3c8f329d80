//! Aspect-ratio estimation, with and without camera intrinsics, and
//! snapping to known document formats.

use doc_geometry::{Homography, Point, Quad};

/// Minimum confidence below which an AR estimate is discarded in favor
/// of raw edge-length ratios.
pub const AR_CONFIDENCE_THRESHOLD: f64 = 0.35;
const FORMAT_TOLERANCE: f64 = 0.03;

/// A known document format and its long-axis-normalized aspect ratio
/// (short side / long side).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnownFormat {
    A4,
    UsLetter,
    IdCard,
    BusinessCard,
    Receipt,
    Square,
}

impl KnownFormat {
    pub fn ratio(self) -> f64 {
        match self {
            KnownFormat::A4 => 0.707,
            KnownFormat::UsLetter => 0.773,
            KnownFormat::IdCard => 0.631,
            KnownFormat::BusinessCard => 0.571,
            KnownFormat::Receipt => 0.325, // midpoint of the 0.25-0.40 band
            KnownFormat::Square => 1.0,
        }
    }

    const ALL: [KnownFormat; 6] = [
        KnownFormat::A4,
        KnownFormat::UsLetter,
        KnownFormat::IdCard,
        KnownFormat::BusinessCard,
        KnownFormat::Receipt,
        KnownFormat::Square,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatioEstimate {
    pub ratio: f64,
    pub confidence: f64,
    pub snapped_format: Option<KnownFormat>,
}

impl AspectRatioEstimate {
    /// Whether the estimate should be trusted to drive rectification
    /// sizing, or ignored in favor of raw edge-length ratios.
    pub fn is_trusted(&self) -> bool {
        self.confidence >= AR_CONFIDENCE_THRESHOLD
    }
}

/// Estimate aspect ratio from opposite-edge length averages alone.
pub fn estimate_without_intrinsics(quad: &Quad) -> AspectRatioEstimate {
    let edges = quad.edge_lengths();
    // TL-TR/BR-BL are the "width" pair, TR-BR/BL-TL the "height" pair.
    let width = (edges[0] + edges[2]) / 2.0;
    let height = (edges[1] + edges[3]) / 2.0;
    let ratio = (width.min(height) / width.max(height)).clamp(0.0, 1.0);

    let snapped = snap_to_known_format(ratio);
    let confidence = match snapped {
        Some(_) => 0.7,
        None => 0.5,
    };

    AspectRatioEstimate {
        ratio: snapped.map(|f| f.ratio()).unwrap_or(ratio),
        confidence,
        snapped_format: snapped,
    }
}

fn snap_to_known_format(ratio: f64) -> Option<KnownFormat> {
    KnownFormat::ALL
        .into_iter()
        .filter(|f| (f.ratio() - ratio).abs() <= FORMAT_TOLERANCE * f.ratio().max(1.0))
        .min_by(|a, b| {
            (a.ratio() - ratio)
                .abs()
                .partial_cmp(&(b.ratio() - ratio).abs())
                .unwrap()
        })
}

/// Estimate aspect ratio by testing candidate ratios against the
/// homography-decomposition orthonormality criterion, disambiguating
/// foreshortening from a genuinely non-square document (used when the
/// camera's intrinsic matrix makes homography decomposition meaningful).
pub fn estimate_with_intrinsics(quad: &Quad, candidate_ratios: &[f64]) -> AspectRatioEstimate {
    let mut best: Option<(f64, f64)> = None; // (ratio, orthonormality error)

    for &r in candidate_ratios {
        if r <= 0.0 || r > 1.0 {
            continue;
        }
        let unit_rect = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0 / r),
            Point::new(0.0, 1.0 / r),
        ];
        let corners = quad.corners();
        let Ok(h) = Homography::from_point_correspondences(&unit_rect, &corners) else {
            continue;
        };
        let error = orthonormality_error(&h);
        if best.map(|(_, best_err)| error < best_err).unwrap_or(true) {
            best = Some((r, error));
        }
    }

    let Some((ratio, error)) = best else {
        return AspectRatioEstimate { ratio: 1.0, confidence: 0.0, snapped_format: None };
    };

    // Orthonormality error of 0 is a perfect rotation; scale to [0,1].
    let confidence = (1.0 - error).clamp(0.0, 1.0);
    let snapped = snap_to_known_format(ratio);

    AspectRatioEstimate {
        ratio: snapped.map(|f| f.ratio()).unwrap_or(ratio),
        confidence,
        snapped_format: snapped,
    }
}

/// Deviation of the homography's upper-left 2x2 block (after removing
/// scale) from an orthonormal rotation: 0 for a perfect front-parallel
/// fit, growing with foreshortening mismatch.
fn orthonormality_error(h: &Homography) -> f64 {
    let m = h.as_matrix();
    let col0 = nalgebra::Vector2::new(m[(0, 0)], m[(1, 0)]);
    let col1 = nalgebra::Vector2::new(m[(0, 1)], m[(1, 1)]);
    let n0 = col0.norm();
    let n1 = col1.norm();
    if n0 < 1e-9 || n1 < 1e-9 {
        return 1.0;
    }
    let dot = col0.dot(&col1) / (n0 * n1);
    let scale_mismatch = (n0 - n1).abs() / n0.max(n1);
    dot.abs() + scale_mismatch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_with_ratio(w: f64, h: f64) -> Quad {
        Quad::new(
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
            w.min(h),
        )
        .unwrap()
    }

    #[test]
    fn snaps_to_a4_within_tolerance() {
        let quad = quad_with_ratio(500.0, 707.0);
        let estimate = estimate_without_intrinsics(&quad);
        assert_eq!(estimate.snapped_format, Some(KnownFormat::A4));
        assert!(estimate.is_trusted());
    }

    #[test]
    fn unrecognized_ratio_uses_raw_estimate() {
        let quad = quad_with_ratio(500.0, 420.0);
        let estimate = estimate_without_intrinsics(&quad);
        assert!(estimate.snapped_format.is_none());
        assert!((estimate.ratio - 0.84).abs() < 0.01);
    }

    #[test]
    fn square_quad_snaps_to_square() {
        let quad = quad_with_ratio(400.0, 400.0);
        let estimate = estimate_without_intrinsics(&quad);
        assert_eq!(estimate.snapped_format, Some(KnownFormat::Square));
    }
}
