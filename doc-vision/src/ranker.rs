use doc_geometry::Quad;

use crate::imageops::GrayImage;

/// Scaling constant for the score-margin penalty applied when the top two
/// candidates are within 15% of each other (spec leaves the exact factor
/// to the implementer; chosen so a near-tie roughly halves confidence
/// rather than barely denting it).
const TIE_BREAK_ALPHA: f64 = 0.3;
const TIE_BREAK_MARGIN_FRACTION: f64 = 0.15;

const AREA_SATURATION_FRACTION: f64 = 0.80;

/// One scored candidate, before the cross-candidate margin penalty.
#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    quad: Quad,
    score: f64,
}

/// Rank a set of quad candidates against an edge map and return the
/// winner with its final, margin-adjusted, margin-factor-scaled
/// confidence — or `None` if the candidate list is empty.
pub fn rank(candidates: &[Quad], edge_map: &GrayImage, frame_width: f64, frame_height: f64) -> Option<(Quad, f64)> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|&quad| ScoredCandidate {
            quad,
            score: base_score(&quad, edge_map, frame_width, frame_height),
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let top = scored.first()?;
    let mut confidence = top.score;

    if let Some(second) = scored.get(1) {
        if second.score >= top.score * (1.0 - TIE_BREAK_MARGIN_FRACTION) && top.score > 0.0 {
            let closeness = 1.0 - (top.score - second.score) / top.score;
            confidence -= TIE_BREAK_ALPHA * closeness;
        }
    }

    confidence *= margin_factor(&top.quad, frame_width, frame_height);
    Some((top.quad, confidence.clamp(0.0, 1.0)))
}

fn base_score(quad: &Quad, edge_map: &GrayImage, frame_width: f64, frame_height: f64) -> f64 {
    0.6 * quad_score(quad, frame_width, frame_height) + 0.4 * edge_density(quad, edge_map)
}

fn quad_score(quad: &Quad, frame_width: f64, frame_height: f64) -> f64 {
    let frame_area = frame_width * frame_height;
    let area_term = (quad.area() / (frame_area * AREA_SATURATION_FRACTION)).min(1.0);

    let angle_term = angle_regularity(quad);
    let balance_term = edge_length_balance(quad);
    let centering_term = centering_score(quad, frame_width, frame_height);

    0.35 * area_term + 0.25 * angle_term + 0.20 * balance_term + 0.20 * centering_term
}

/// 1.0 when every interior angle is exactly 90 degrees, falling off
/// quadratically with deviation, averaged across the four corners.
fn angle_regularity(quad: &Quad) -> f64 {
    let corners = quad.corners();
    let mut total = 0.0;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let cur = corners[i];
        let next = corners[(i + 1) % 4];
        let v1 = prev - cur;
        let v2 = next - cur;
        let cos_angle = v1.dot(&v2) / (v1.norm() * v2.norm()).max(1e-9);
        let angle_deg = cos_angle.clamp(-1.0, 1.0).acos().to_degrees();
        let deviation = (angle_deg - 90.0) / 90.0;
        total += (1.0 - deviation * deviation).max(0.0);
    }
    total / 4.0
}

/// 1.0 when both pairs of opposite edges are equal length.
fn edge_length_balance(quad: &Quad) -> f64 {
    let e = quad.edge_lengths();
    let ratio_a = e[0].min(e[2]) / e[0].max(e[2]).max(1e-9);
    let ratio_b = e[1].min(e[3]) / e[1].max(e[3]).max(1e-9);
    (ratio_a + ratio_b) / 2.0
}

/// 1.0 at the frame center, decaying linearly to 0 at the frame corner
/// distance.
fn centering_score(quad: &Quad, frame_width: f64, frame_height: f64) -> f64 {
    let center = quad.centroid();
    let frame_center_x = frame_width / 2.0;
    let frame_center_y = frame_height / 2.0;
    let max_dist = (frame_center_x.powi(2) + frame_center_y.powi(2)).sqrt();
    let dist = ((center.x - frame_center_x).powi(2) + (center.y - frame_center_y).powi(2)).sqrt();
    (1.0 - dist / max_dist.max(1e-9)).clamp(0.0, 1.0)
}

/// Fraction of perimeter samples (1 px spacing, checked within a ±2 px
/// band) that land on a nonzero edge pixel.
fn edge_density(quad: &Quad, edge_map: &GrayImage) -> f64 {
    let corners = quad.corners();
    let mut total = 0usize;
    let mut hits = 0usize;

    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let length = (b - a).norm().max(1.0);
        let steps = length.ceil() as usize;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            total += 1;
            if band_has_edge(edge_map, x, y, 2) {
                hits += 1;
            }
        }
    }

    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn band_has_edge(edge_map: &GrayImage, x: f64, y: f64, band: i64) -> bool {
    for dy in -band..=band {
        for dx in -band..=band {
            let px = x as i64 + dx;
            let py = y as i64 + dy;
            if px >= 0 && py >= 0 && (px as usize) < edge_map.width && (py as usize) < edge_map.height {
                if edge_map.get(px as usize, py as usize) == 255 {
                    return true;
                }
            }
        }
    }
    false
}

/// How close the quad sits to the frame edges, in `[0.5, 1.0]`; closer
/// quads are penalized to reflect partial-document risk.
fn margin_factor(quad: &Quad, frame_width: f64, frame_height: f64) -> f64 {
    let corners = quad.corners();
    let min_dist = corners
        .iter()
        .map(|c| {
            c.x.min(frame_width - c.x).min(c.y).min(frame_height - c.y)
        })
        .fold(f64::INFINITY, f64::min);
    let normalized = (min_dist / (frame_width.min(frame_height) * 0.1)).clamp(0.0, 1.0);
    0.5 + 0.5 * normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_geometry::Point;

    fn square_edge_map(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut data = vec![0u8; w * h];
        for x in x0..=x1 {
            data[y0 * w + x] = 255;
            data[y1 * w + x] = 255;
        }
        for y in y0..=y1 {
            data[y * w + x0] = 255;
            data[y * w + x1] = 255;
        }
        GrayImage::new(w, h, data)
    }

    fn quad(x0: f64, y0: f64, x1: f64, y1: f64) -> Quad {
        Quad::new(
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
            (x1 - x0).min(y1 - y0),
        )
        .unwrap()
    }

    #[test]
    fn prefers_well_aligned_centered_candidate_with_supporting_edges() {
        let edges = square_edge_map(400, 400, 100, 100, 300, 300);
        let good = quad(100.0, 100.0, 300.0, 300.0);
        let bad = quad(10.0, 10.0, 60.0, 380.0);
        let (winner, confidence) = rank(&[bad, good], &edges, 400.0, 400.0).unwrap();
        assert_eq!(winner, good);
        assert!(confidence > 0.5);
    }

    #[test]
    fn applies_tie_break_penalty_for_close_scores() {
        let edges = square_edge_map(400, 400, 100, 100, 300, 300);
        let a = quad(100.0, 100.0, 300.0, 300.0);
        let b = quad(102.0, 100.0, 300.0, 300.0);
        let (_, with_tie) = rank(&[a, b], &edges, 400.0, 400.0).unwrap();
        let (_, without_tie) = rank(&[a], &edges, 400.0, 400.0).unwrap();
        assert!(with_tie <= without_tie);
    }

    #[test]
    fn empty_candidates_yield_none() {
        let edges = GrayImage::filled(10, 10, 0);
        assert!(rank(&[], &edges, 10.0, 10.0).is_none());
    }
}
