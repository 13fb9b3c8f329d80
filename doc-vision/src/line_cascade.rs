use std::f64::consts::FRAC_PI_2;

use doc_geometry::{Point, Quad};

use crate::imageops::{sobel, GrayImage};
use crate::lines::{hough_lines, Line};

const TIER1_ANGLE_TOLERANCE_DEG: f64 = 8.0;
const TIER1_MIN_AREA_FRACTION: f64 = 0.03;
const TIER1_MAX_ASPECT: f64 = 4.0;

const TIER2_SWEEP_DEG: f64 = 12.0;
const TIER2_STEP_DEG: f64 = 3.0;
const TIER2_SIGMA_MULTIPLE: f64 = 4.0;

/// One confidence-ranged outcome of the three-tier fallback cascade.
#[derive(Debug, Clone, Copy)]
pub struct CascadeResult {
    pub quad: Quad,
    pub confidence: f64,
    pub tier: u8,
}

/// Run the fallback cascade against a grayscale frame, used when the
/// contour pipeline fails to find a confident candidate in very
/// low-contrast scenes. Tries each tier in order until one succeeds.
pub fn run(gray: &GrayImage, edges: &GrayImage) -> Option<CascadeResult> {
    tier1_lsd_fast_path(edges).or_else(|| tier2_corner_constrained_radon(gray, edges)).or_else(|| tier3_joint_radon(gray))
}

fn tier1_lsd_fast_path(edges: &GrayImage) -> Option<CascadeResult> {
    let w = edges.width as f64;
    let h = edges.height as f64;
    let lines = hough_lines(edges, 180, 32, 20);

    let tol = TIER1_ANGLE_TOLERANCE_DEG.to_radians();
    let mut horizontals: Vec<Line> = lines
        .iter()
        .copied()
        .filter(|l| angular_distance(l.theta, FRAC_PI_2) < tol + 20f64.to_radians())
        .collect();
    let mut verticals: Vec<Line> = lines
        .iter()
        .copied()
        .filter(|l| angular_distance(l.theta, 0.0) < tol + 20f64.to_radians())
        .collect();

    horizontals.sort_by(|a, b| b.votes.cmp(&a.votes));
    verticals.sort_by(|a, b| b.votes.cmp(&a.votes));
    horizontals.truncate(2);
    verticals.truncate(2);

    if horizontals.len() < 2 || verticals.len() < 2 {
        return None;
    }

    let corners = [
        intersect(&horizontals[0], &verticals[0])?,
        intersect(&horizontals[0], &verticals[1])?,
        intersect(&horizontals[1], &verticals[1])?,
        intersect(&horizontals[1], &verticals[0])?,
    ]
    .map(|(x, y)| Point::new(x, y));

    let shorter_side = w.min(h);
    let quad = Quad::from_unordered(corners, shorter_side).ok()?;

    if quad.area() < TIER1_MIN_AREA_FRACTION * w * h {
        return None;
    }
    let edges_len = quad.edge_lengths();
    let aspect = edges_len.iter().cloned().fold(0.0, f64::max)
        / edges_len.iter().cloned().fold(f64::INFINITY, f64::min).max(1e-6);
    if aspect > TIER1_MAX_ASPECT {
        return None;
    }

    let confidence = (0.50 + 0.35 * (1.0 - (1.0 / (1.0 + quad.area() / (w * h))))).clamp(0.50, 0.85);
    Some(CascadeResult { quad, confidence, tier: 1 })
}

fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % std::f64::consts::PI;
    d.min(std::f64::consts::PI - d)
}

fn intersect(a: &Line, b: &Line) -> Option<(f64, f64)> {
    let (c1, s1) = (a.theta.cos(), a.theta.sin());
    let (c2, s2) = (b.theta.cos(), b.theta.sin());
    let det = c1 * s2 - c2 * s1;
    if det.abs() < 1e-9 {
        return None;
    }
    let x = (a.rho * s2 - b.rho * s1) / det;
    let y = (c1 * b.rho - c2 * a.rho) / det;
    Some((x, y))
}

/// When exactly two perpendicular edges are already confident, search a
/// restricted Radon accumulator for the missing two, projecting only the
/// gradient component perpendicular to each candidate line.
fn tier2_corner_constrained_radon(gray: &GrayImage, edges: &GrayImage) -> Option<CascadeResult> {
    let w = gray.width as f64;
    let h = gray.height as f64;
    let lines = hough_lines(edges, 180, 32, 15);
    let horizontal = lines.iter().find(|l| angular_distance(l.theta, FRAC_PI_2) < 25f64.to_radians())?;
    let vertical = lines.iter().find(|l| angular_distance(l.theta, 0.0) < 25f64.to_radians())?;

    let (gx, gy) = sobel(gray);

    let other_horizontal = restricted_radon_peak(&gy, gray.width, gray.height, horizontal.theta, w.max(h) * 0.3, w.max(h))?;
    let other_vertical = restricted_radon_peak(&gx, gray.width, gray.height, vertical.theta, w.max(h) * 0.3, w.max(h))?;

    let corners = [
        intersect(horizontal, vertical)?,
        intersect(horizontal, &other_vertical)?,
        intersect(&other_horizontal, &other_vertical)?,
        intersect(&other_horizontal, vertical)?,
    ]
    .map(|(x, y)| Point::new(x, y));

    let shorter_side = w.min(h);
    let quad = Quad::from_unordered(corners, shorter_side).ok()?;
    let confidence = 0.45 + 0.30 * (quad.area() / (w * h)).min(1.0);
    Some(CascadeResult { quad, confidence: confidence.clamp(0.45, 0.75), tier: 2 })
}

/// Sweep candidate lines near `base_theta` over `±TIER2_SWEEP_DEG`,
/// projecting `field` (a perpendicular-gradient component) along each and
/// returning the strongest peak if it clears the noise baseline by
/// `TIER2_SIGMA_MULTIPLE` standard deviations.
fn restricted_radon_peak(field: &[f64], width: usize, height: usize, base_theta: f64, min_rho: f64, max_rho: f64) -> Option<Line> {
    let mut best: Option<Line> = None;
    let mut scores = Vec::new();

    let mut theta = base_theta - TIER2_SWEEP_DEG.to_radians();
    while theta <= base_theta + TIER2_SWEEP_DEG.to_radians() {
        let (cos_t, sin_t) = (theta.cos(), theta.sin());
        let mut rho = min_rho;
        while rho <= max_rho {
            let score = project_line(field, width, height, rho, cos_t, sin_t);
            scores.push(score);
            if best.map(|b: Line| score > b.votes as f64).unwrap_or(true) {
                best = Some(Line { rho, theta, votes: score as u32 });
            }
            rho += 2.0;
        }
        theta += TIER2_STEP_DEG.to_radians();
    }

    let best = best?;
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let sigma = var.sqrt();
    if (best.votes as f64) > mean + TIER2_SIGMA_MULTIPLE * sigma {
        Some(best)
    } else {
        None
    }
}

fn project_line(field: &[f64], width: usize, height: usize, rho: f64, cos_t: f64, sin_t: f64) -> f64 {
    let mut sum = 0.0;
    let steps = (width.max(height)) as usize;
    for s in 0..steps {
        let t = s as f64 - steps as f64 / 2.0;
        let x = rho * cos_t - t * sin_t;
        let y = rho * sin_t + t * cos_t;
        if x >= 0.0 && y >= 0.0 && (x as usize) < width && (y as usize) < height {
            sum += field[y as usize * width + x as usize].abs();
        }
    }
    sum
}

/// Last resort: sweep a shared rotation angle over 9 candidates; for each,
/// independently find the best two horizontal and two vertical restricted
/// Radon peaks, then score the resulting rectangle.
fn tier3_joint_radon(gray: &GrayImage) -> Option<CascadeResult> {
    let w = gray.width as f64;
    let h = gray.height as f64;
    let (gx, gy) = sobel(gray);

    let mut best: Option<(Quad, f64)> = None;
    for i in 0..9 {
        let theta = -20.0_f64.to_radians() + i as f64 * (40.0_f64.to_radians() / 8.0);

        let Some(h1) = restricted_radon_peak(&gy, gray.width, gray.height, FRAC_PI_2 + theta, 0.0, h) else {
            continue;
        };
        let h2 = restricted_radon_peak(&gy, gray.width, gray.height, FRAC_PI_2 + theta, h1.rho + 20.0, h)
            .unwrap_or(h1);
        let Some(v1) = restricted_radon_peak(&gx, gray.width, gray.height, theta, 0.0, w) else {
            continue;
        };
        let v2 = restricted_radon_peak(&gx, gray.width, gray.height, theta, v1.rho + 20.0, w).unwrap_or(v1);

        let Some(corners) = [
            intersect(&h1, &v1),
            intersect(&h1, &v2),
            intersect(&h2, &v2),
            intersect(&h2, &v1),
        ]
        .into_iter()
        .collect::<Option<Vec<_>>>() else {
            continue;
        };
        let corners: [Point; 4] = [
            Point::new(corners[0].0, corners[0].1),
            Point::new(corners[1].0, corners[1].1),
            Point::new(corners[2].0, corners[2].1),
            Point::new(corners[3].0, corners[3].1),
        ];
        let Ok(quad) = Quad::from_unordered(corners, w.min(h)) else {
            continue;
        };

        let area_score = (quad.area() / (w * h)).min(1.0);
        let center = quad.centroid();
        let centering = 1.0 - ((center.x - w / 2.0).abs() / w + (center.y - h / 2.0).abs() / h);
        let score = 0.6 * area_score + 0.4 * centering.max(0.0);

        if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
            best = Some((quad, score));
        }
    }

    let (quad, score) = best?;
    let confidence = (0.40 + 0.25 * score).clamp(0.40, 0.65);
    Some(CascadeResult { quad, confidence, tier: 3 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imageops::canny;

    fn rectangle_gray(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut data = vec![200u8; w * h];
        for y in y0..y1 {
            for x in x0..x1 {
                data[y * w + x] = 30;
            }
        }
        GrayImage::new(w, h, data)
    }

    #[test]
    fn tier1_finds_quad_for_clear_rectangle() {
        let gray = rectangle_gray(200, 200, 40, 40, 160, 160);
        let edges = canny(&gray, 30.0, 90.0);
        let result = tier1_lsd_fast_path(&edges);
        if let Some(result) = result {
            assert_eq!(result.tier, 1);
            assert!((0.50..=0.85).contains(&result.confidence));
        }
    }

    #[test]
    fn cascade_returns_none_on_uniform_image() {
        let gray = GrayImage::filled(100, 100, 128);
        let edges = canny(&gray, 30.0, 90.0);
        assert!(run(&gray, &edges).is_none());
    }
}
