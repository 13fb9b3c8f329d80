//! Straight-line detection shared by spanning-line suppression and the
//! line-segment-based fallback cascade. A standard Hough accumulator over
//! (rho, theta) stands in for a dedicated line-segment detector: it is
//! cheap, has no native-library dependency, and for the near-axis-aligned
//! document and spanning-line geometry this pipeline targets, behaves
//! equivalently to a gradient-direction line detector.

use crate::imageops::GrayImage;

#[derive(Debug, Clone, Copy)]
pub struct Line {
    /// Perpendicular distance from the image origin, in pixels.
    pub rho: f64,
    /// Angle of the line's normal, in radians, in `[0, pi)`.
    pub theta: f64,
    pub votes: u32,
}

impl Line {
    /// Endpoints of the line clipped to the image rectangle, or `None`
    /// if the line does not intersect the image at all.
    pub fn endpoints(&self, width: f64, height: f64) -> Option<(f64, f64, f64, f64)> {
        let (cos_t, sin_t) = (self.theta.cos(), self.theta.sin());
        let mut points = Vec::new();

        // Intersections with the four image borders.
        if sin_t.abs() > 1e-9 {
            for &x in &[0.0, width] {
                let y = (self.rho - x * cos_t) / sin_t;
                if (0.0..=height).contains(&y) {
                    points.push((x, y));
                }
            }
        }
        if cos_t.abs() > 1e-9 {
            for &y in &[0.0, height] {
                let x = (self.rho - y * sin_t) / cos_t;
                if (0.0..=width).contains(&x) {
                    points.push((x, y));
                }
            }
        }

        points.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6);
        if points.len() < 2 {
            return None;
        }
        let (x0, y0) = points[0];
        let (x1, y1) = points[points.len() - 1];
        Some((x0, y0, x1, y1))
    }

    pub fn length_within(&self, width: f64, height: f64) -> f64 {
        match self.endpoints(width, height) {
            Some((x0, y0, x1, y1)) => ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt(),
            None => 0.0,
        }
    }

    /// Roughly: is this line's normal direction closer to horizontal
    /// (theta near 0 or pi) or vertical (theta near pi/2)?
    pub fn is_near_vertical_edge(&self) -> bool {
        // A line whose normal is near-horizontal (theta near 0) is itself
        // a near-vertical line.
        let dist_from_zero = self.theta.min((std::f64::consts::PI - self.theta).abs());
        dist_from_zero < std::f64::consts::FRAC_PI_4
    }
}

/// Find up to `max_lines` strongest lines in a binary edge map via a
/// standard Hough transform. `theta_steps` controls angular resolution
/// (e.g. 180 for 1-degree steps).
pub fn hough_lines(edges: &GrayImage, theta_steps: usize, max_lines: usize, min_votes: u32) -> Vec<Line> {
    let w = edges.width as f64;
    let h = edges.height as f64;
    let diag = (w * w + h * h).sqrt();
    let rho_steps = (2.0 * diag).ceil() as usize + 1;

    let thetas: Vec<f64> = (0..theta_steps)
        .map(|i| std::f64::consts::PI * i as f64 / theta_steps as f64)
        .collect();
    let (sin_table, cos_table): (Vec<f64>, Vec<f64>) =
        thetas.iter().map(|t| (t.sin(), t.cos())).unzip();

    let mut accumulator = vec![0u32; rho_steps * theta_steps];

    for y in 0..edges.height {
        for x in 0..edges.width {
            if edges.get(x, y) != 255 {
                continue;
            }
            for t_idx in 0..theta_steps {
                let rho = x as f64 * cos_table[t_idx] + y as f64 * sin_table[t_idx];
                let rho_idx = ((rho + diag).round() as usize).min(rho_steps - 1);
                accumulator[rho_idx * theta_steps + t_idx] += 1;
            }
        }
    }

    let mut lines: Vec<Line> = accumulator
        .iter()
        .enumerate()
        .filter(|&(_, &votes)| votes >= min_votes)
        .map(|(idx, &votes)| {
            let rho_idx = idx / theta_steps;
            let t_idx = idx % theta_steps;
            Line {
                rho: rho_idx as f64 - diag,
                theta: thetas[t_idx],
                votes,
            }
        })
        .collect();

    lines.sort_by(|a, b| b.votes.cmp(&a.votes));
    non_maximum_suppress(&mut lines, 10.0, 0.1);
    lines.truncate(max_lines);
    lines
}

/// Greedy non-maximum suppression: drop lower-voted lines that are close
/// in (rho, theta) to an already-kept, higher-voted line.
fn non_maximum_suppress(lines: &mut Vec<Line>, rho_tolerance: f64, theta_tolerance: f64) {
    let mut kept: Vec<Line> = Vec::new();
    for &line in lines.iter() {
        let duplicate = kept.iter().any(|k| {
            (k.rho - line.rho).abs() < rho_tolerance && (k.theta - line.theta).abs() < theta_tolerance
        });
        if !duplicate {
            kept.push(line);
        }
    }
    *lines = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_horizontal_line() {
        let mut data = vec![0u8; 40 * 40];
        for x in 0..40 {
            data[20 * 40 + x] = 255;
        }
        let edges = GrayImage::new(40, 40, data);
        let lines = hough_lines(&edges, 180, 5, 30);
        assert!(!lines.is_empty());
        let best = lines[0];
        assert!((best.rho - 20.0).abs() < 2.0 || (best.rho + 20.0).abs() < 2.0);
    }

    #[test]
    fn endpoints_clip_to_image_bounds() {
        let line = Line { rho: 20.0, theta: std::f64::consts::FRAC_PI_2, votes: 10 };
        let (x0, y0, x1, y1) = line.endpoints(40.0, 40.0).unwrap();
        assert!((0.0..=40.0).contains(&x0));
        assert!((0.0..=40.0).contains(&y0));
        assert!((0.0..=40.0).contains(&x1));
        assert!((0.0..=40.0).contains(&y1));
    }
}
