//! Pyramidal Lucas-Kanade sparse optical flow over a handful of tracked
//! points (here, always the four document corners).

use doc_geometry::Point;

const WINDOW_RADIUS: i64 = 7; // 15x15 window
const PYRAMID_LEVELS: usize = 2;
const MAX_ITERATIONS: u32 = 20;
const CONVERGENCE_EPS: f64 = 0.03;

/// Per-point outcome of a tracking step.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPoint {
    pub position: Point,
    pub error: f64,
    pub lost: bool,
}

/// Track `points` from `prev` to `cur` (same dimensions, row-major 8-bit
/// luminance), using a 2-level image pyramid and iterative
/// Lucas-Kanade refinement at each level, coarse to fine.
pub fn track(
    prev: &[u8],
    cur: &[u8],
    width: usize,
    height: usize,
    points: &[Point],
) -> Vec<TrackedPoint> {
    let prev_pyramid = build_pyramid(prev, width, height, PYRAMID_LEVELS);
    let cur_pyramid = build_pyramid(cur, width, height, PYRAMID_LEVELS);

    points
        .iter()
        .map(|&p| track_single_point(&prev_pyramid, &cur_pyramid, p))
        .collect()
}

struct PyramidLevel {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

fn build_pyramid(data: &[u8], width: usize, height: usize, levels: usize) -> Vec<PyramidLevel> {
    let mut pyramid = vec![PyramidLevel { data: data.to_vec(), width, height }];
    for _ in 1..levels {
        let prev = pyramid.last().unwrap();
        pyramid.push(downsample_half(prev));
    }
    pyramid
}

fn downsample_half(level: &PyramidLevel) -> PyramidLevel {
    let w = (level.width / 2).max(1);
    let h = (level.height / 2).max(1);
    let mut data = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let sx = (x * 2).min(level.width - 1);
            let sy = (y * 2).min(level.height - 1);
            data[y * w + x] = level.data[sy * level.width + sx];
        }
    }
    PyramidLevel { data, width: w, height: h }
}

fn track_single_point(prev_pyramid: &[PyramidLevel], cur_pyramid: &[PyramidLevel], point: Point) -> TrackedPoint {
    let top_level = prev_pyramid.len() - 1;
    let scale = 0.5_f64.powi(top_level as i32);
    let mut estimate = Point::new(point.x * scale, point.y * scale);
    let mut lost = false;
    let mut error = 0.0;

    for level in (0..=top_level).rev() {
        if level != top_level {
            estimate = Point::new(estimate.x * 2.0, estimate.y * 2.0);
        }
        let prev = &prev_pyramid[level];
        let cur = &cur_pyramid[level];
        let (refined, level_error, level_lost) = lucas_kanade_refine(prev, cur, estimate);
        estimate = refined;
        error = level_error;
        lost = lost || level_lost;
    }

    TrackedPoint { position: estimate, error, lost }
}

/// Iterative single-level Lucas-Kanade refinement around `initial`.
fn lucas_kanade_refine(prev: &PyramidLevel, cur: &PyramidLevel, initial: Point) -> (Point, f64, bool) {
    let mut position = initial;
    let mut final_error = f64::INFINITY;

    for _ in 0..MAX_ITERATIONS {
        if !in_bounds(prev, position) {
            return (position, f64::INFINITY, true);
        }

        let mut sum_ixx = 0.0;
        let mut sum_iyy = 0.0;
        let mut sum_ixy = 0.0;
        let mut sum_ixt = 0.0;
        let mut sum_iyt = 0.0;
        let mut samples = 0;
        let mut sum_abs_it = 0.0;

        for dy in -WINDOW_RADIUS..=WINDOW_RADIUS {
            for dx in -WINDOW_RADIUS..=WINDOW_RADIUS {
                let px = position.x + dx as f64;
                let py = position.y + dy as f64;
                if !in_bounds_xy(prev, px, py) {
                    continue;
                }
                let ix = gradient_x(prev, px, py);
                let iy = gradient_y(prev, px, py);
                let it = sample(cur, px, py) - sample(prev, px, py);

                sum_ixx += ix * ix;
                sum_iyy += iy * iy;
                sum_ixy += ix * iy;
                sum_ixt += ix * it;
                sum_iyt += iy * it;
                sum_abs_it += it.abs();
                samples += 1;
            }
        }

        if samples == 0 {
            return (position, f64::INFINITY, true);
        }

        let det = sum_ixx * sum_iyy - sum_ixy * sum_ixy;
        if det.abs() < 1e-6 {
            return (position, f64::INFINITY, true);
        }

        let du = (sum_iyy * -sum_ixt - sum_ixy * -sum_iyt) / det;
        let dv = (sum_ixx * -sum_iyt - sum_ixy * -sum_ixt) / det;

        position = Point::new(position.x + du, position.y + dv);
        final_error = sum_abs_it / samples as f64;

        if (du * du + dv * dv).sqrt() < CONVERGENCE_EPS {
            break;
        }
    }

    (position, final_error, false)
}

fn in_bounds(level: &PyramidLevel, p: Point) -> bool {
    in_bounds_xy(level, p.x, p.y)
}

fn in_bounds_xy(level: &PyramidLevel, x: f64, y: f64) -> bool {
    x >= 1.0 && y >= 1.0 && x < (level.width as f64 - 1.0) && y < (level.height as f64 - 1.0)
}

fn sample(level: &PyramidLevel, x: f64, y: f64) -> f64 {
    // Bilinear sample.
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let get = |xi: i64, yi: i64| -> f64 {
        let xi = xi.clamp(0, level.width as i64 - 1) as usize;
        let yi = yi.clamp(0, level.height as i64 - 1) as usize;
        level.data[yi * level.width + xi] as f64
    };

    let top = get(x0, y0) * (1.0 - fx) + get(x0 + 1, y0) * fx;
    let bottom = get(x0, y0 + 1) * (1.0 - fx) + get(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

fn gradient_x(level: &PyramidLevel, x: f64, y: f64) -> f64 {
    (sample(level, x + 1.0, y) - sample(level, x - 1.0, y)) / 2.0
}

fn gradient_y(level: &PyramidLevel, x: f64, y: f64) -> f64 {
    (sample(level, x, y + 1.0) - sample(level, x, y - 1.0)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_image(w: usize, h: usize) -> Vec<u8> {
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                data[y * w + x] = (((x * 7 + y * 13) % 256) as u8).max(10);
            }
        }
        data
    }

    #[test]
    fn tracks_a_stationary_point_with_zero_displacement() {
        let img = textured_image(64, 64);
        let points = [Point::new(32.0, 32.0)];
        let result = track(&img, &img, 64, 64, &points);
        assert!(!result[0].lost);
        assert!((result[0].position.x - 32.0).abs() < 1.0);
        assert!((result[0].position.y - 32.0).abs() < 1.0);
    }

    #[test]
    fn out_of_bounds_point_is_marked_lost() {
        let img = textured_image(64, 64);
        let points = [Point::new(1000.0, 1000.0)];
        let result = track(&img, &img, 64, 64, &points);
        assert!(result[0].lost);
    }
}
