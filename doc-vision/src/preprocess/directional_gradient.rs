use crate::imageops::{self, normalize_to_u8, percentile_threshold, sobel, GrayImage};

const TILT_DEGREES: [f64; 5] = [-10.0, -5.0, 0.0, 5.0, 10.0];
const TAP_RADIUS: i64 = 10; // 21-tap kernel
const TOP_FRACTION: f64 = 0.10;

/// The low-contrast directional-gradient strategy: aggregate gradient
/// magnitude along several near-horizontal/near-vertical tilt angles so
/// that a faint, long document edge accumulates signal-to-noise that a
/// pointwise Sobel response cannot.
pub fn run(img: &GrayImage) -> GrayImage {
    let (gx, gy) = sobel(img);
    let abs_gx: Vec<f64> = gx.iter().map(|v| v.abs()).collect();
    let abs_gy: Vec<f64> = gy.iter().map(|v| v.abs()).collect();

    let w = img.width;
    let h = img.height;
    let mut response = vec![0.0_f64; w * h];

    for &tilt_deg in &TILT_DEGREES {
        let theta = tilt_deg.to_radians();
        // Horizontal edge response: average |Gy| along the tilt direction.
        let (dx, dy) = (theta.cos(), theta.sin());
        let h_resp = directional_average(&abs_gy, w, h, dx, dy);
        // Vertical edge response: average |Gx| along the perpendicular.
        let (pdx, pdy) = (-theta.sin(), theta.cos());
        let v_resp = directional_average(&abs_gx, w, h, pdx, pdy);

        for i in 0..response.len() {
            response[i] = response[i].max(h_resp[i]).max(v_resp[i]);
        }
    }

    let normalized = normalize_to_u8(&response);
    let normalized_f: Vec<f64> = normalized.iter().map(|&v| v as f64).collect();
    let thresholded = percentile_threshold(&normalized_f, w, h, TOP_FRACTION);
    imageops::morph_close(&thresholded, 3)
}

/// Average `field` over `2*TAP_RADIUS+1` samples along direction `(dx,
/// dy)` at each pixel, using nearest-neighbor sampling.
fn directional_average(field: &[f64], w: usize, h: usize, dx: f64, dy: f64) -> Vec<f64> {
    let mut out = vec![0.0; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            let mut n = 0;
            for t in -TAP_RADIUS..=TAP_RADIUS {
                let sx = (x as f64 + t as f64 * dx).round();
                let sy = (y as f64 + t as f64 * dy).round();
                if sx >= 0.0 && sy >= 0.0 && (sx as usize) < w && (sy as usize) < h {
                    acc += field[sy as usize * w + sx as usize];
                    n += 1;
                }
            }
            out[y * w + x] = if n > 0 { acc / n as f64 } else { 0.0 };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_binary_output_same_size_as_input() {
        let mut data = vec![50u8; 40 * 40];
        for y in 0..40 {
            data[y * 40 + 20] = 60; // faint vertical line, low contrast
        }
        let img = GrayImage::new(40, 40, data);
        let out = run(&img);
        assert_eq!((out.width, out.height), (40, 40));
        assert!(out.data.iter().all(|&v| v == 0 || v == 255));
    }
}
