//! Sub-pixel corner refinement: locally optimizes each corner within an
//! 11x11 window by inverting the local intensity Hessian, converging once
//! the update falls below `CONVERGENCE_EPS_PX` or after `MAX_ITERATIONS`.

use doc_geometry::{Point, Quad};
use doc_vision::imageops::GrayImage;

const WINDOW_RADIUS: i64 = 5; // 11x11 window
const MAX_ITERATIONS: u32 = 20;
const CONVERGENCE_EPS_PX: f64 = 0.03;

/// Refine every corner of `quad` against `gray`, returning a new quad.
/// Falls back to the original corner wherever the local Hessian is
/// singular (e.g. a flat region with no usable gradient).
#[tracing::instrument(level = "debug", skip_all)]
pub fn refine(quad: &Quad, gray: &GrayImage, shorter_side: f64) -> Quad {
    let refined: Vec<Point> = quad
        .corners()
        .iter()
        .map(|&c| refine_corner(gray, c))
        .collect();
    let refined: [Point; 4] = refined.try_into().unwrap();
    Quad::from_unordered(refined, shorter_side).unwrap_or(*quad)
}

fn refine_corner(gray: &GrayImage, initial: Point) -> Point {
    let mut position = initial;

    for _ in 0..MAX_ITERATIONS {
        let Some((gx, gy, hxx, hyy, hxy)) = accumulate_window(gray, position) else {
            break;
        };

        let det = hxx * hyy - hxy * hxy;
        if det.abs() < 1e-6 {
            break;
        }

        let dx = (hyy * -gx - hxy * -gy) / det;
        let dy = (hxx * -gy - hxy * -gx) / det;

        position = Point::new(position.x + dx, position.y + dy);

        if (dx * dx + dy * dy).sqrt() < CONVERGENCE_EPS_PX {
            break;
        }
    }

    position
}

/// Accumulate the gradient vector and Hessian entries of the local
/// intensity surface over an `11x11` window centered on `center`.
fn accumulate_window(gray: &GrayImage, center: Point) -> Option<(f64, f64, f64, f64, f64)> {
    let cx = center.x;
    let cy = center.y;
    if cx < (WINDOW_RADIUS + 1) as f64
        || cy < (WINDOW_RADIUS + 1) as f64
        || cx >= gray.width as f64 - (WINDOW_RADIUS + 1) as f64
        || cy >= gray.height as f64 - (WINDOW_RADIUS + 1) as f64
    {
        return None;
    }

    let mut gx_sum = 0.0;
    let mut gy_sum = 0.0;
    let mut hxx = 0.0;
    let mut hyy = 0.0;
    let mut hxy = 0.0;
    let mut samples = 0;

    for dy in -WINDOW_RADIUS..=WINDOW_RADIUS {
        for dx in -WINDOW_RADIUS..=WINDOW_RADIUS {
            let x = (cx.round() as i64 + dx) as i64;
            let y = (cy.round() as i64 + dy) as i64;

            let ix = (gray.get_clamped(x + 1, y) as f64 - gray.get_clamped(x - 1, y) as f64) / 2.0;
            let iy = (gray.get_clamped(x, y + 1) as f64 - gray.get_clamped(x, y - 1) as f64) / 2.0;
            let ixx = gray.get_clamped(x + 1, y) as f64 - 2.0 * gray.get_clamped(x, y) as f64
                + gray.get_clamped(x - 1, y) as f64;
            let iyy = gray.get_clamped(x, y + 1) as f64 - 2.0 * gray.get_clamped(x, y) as f64
                + gray.get_clamped(x, y - 1) as f64;
            let ixy = (gray.get_clamped(x + 1, y + 1) as f64
                - gray.get_clamped(x + 1, y - 1) as f64
                - gray.get_clamped(x - 1, y + 1) as f64
                + gray.get_clamped(x - 1, y - 1) as f64)
                / 4.0;

            // Weight by gradient magnitude so flat sub-windows contribute
            // little to the estimate, favoring genuine corner structure.
            let weight = (ix * ix + iy * iy).sqrt();
            gx_sum += ix * weight;
            gy_sum += iy * weight;
            hxx += ixx.abs() * weight + 1e-3;
            hyy += iyy.abs() * weight + 1e-3;
            hxy += ixy * weight;
            samples += 1;
        }
    }

    if samples == 0 {
        return None;
    }
    Some((gx_sum, gy_sum, hxx, hyy, hxy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard_corner_image(w: usize, h: usize) -> GrayImage {
        let mut data = vec![30u8; w * h];
        for y in (h / 2)..h {
            for x in (w / 2)..w {
                data[y * w + x] = 220;
            }
        }
        GrayImage::new(w, h, data)
    }

    #[test]
    fn refine_corner_stays_near_a_sharp_corner() {
        let gray = checkerboard_corner_image(64, 64);
        let initial = Point::new(33.0, 33.0);
        let refined = refine_corner(&gray, initial);
        assert!((refined.x - 32.0).abs() < 4.0);
        assert!((refined.y - 32.0).abs() < 4.0);
    }

    #[test]
    fn refine_leaves_flat_region_corners_in_place() {
        let gray = GrayImage::filled(64, 64, 128);
        let initial = Point::new(20.0, 20.0);
        let refined = refine_corner(&gray, initial);
        assert_eq!(refined, initial);
    }
}
