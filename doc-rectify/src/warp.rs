//! Perspective warp from a detected quad to a front-parallel rectangle.

use doc_geometry::{Homography, Point, Quad};
use image::{Rgb, RgbImage};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Used for the capture path.
    Bicubic,
    /// Used for any preview/live path.
    Bilinear,
}

/// Compute the output rectangle size for a given quad and aspect ratio:
/// long side equals the longer mean opposite-edge length, short side
/// follows `ratio` (short/long, in `(0, 1]`).
pub fn output_dimensions(quad: &Quad, ratio: f64) -> (u32, u32) {
    let edges = quad.edge_lengths();
    let width_mean = (edges[0] + edges[2]) / 2.0;
    let height_mean = (edges[1] + edges[3]) / 2.0;
    let long_side = width_mean.max(height_mean);
    if width_mean >= height_mean {
        (long_side.round() as u32, (long_side * ratio).round().max(1.0) as u32)
    } else {
        ((long_side * ratio).round().max(1.0) as u32, long_side.round() as u32)
    }
}

/// Warp `source` so that `quad` maps onto a rectangle of size
/// `(out_width, out_height)`, using `interpolation`.
#[tracing::instrument(level = "debug", skip(source))]
pub fn warp(
    source: &RgbImage,
    quad: &Quad,
    out_width: u32,
    out_height: u32,
    interpolation: Interpolation,
) -> Result<RgbImage> {
    if out_width == 0 || out_height == 0 {
        return Err(Error::DegenerateOutputRectangle);
    }

    let dst = [
        Point::new(0.0, 0.0),
        Point::new(out_width as f64, 0.0),
        Point::new(out_width as f64, out_height as f64),
        Point::new(0.0, out_height as f64),
    ];
    let src = quad.corners();
    let forward = Homography::from_point_correspondences(&src, &dst)?;
    let inverse = forward.inverse()?;

    let mut output = RgbImage::new(out_width, out_height);
    for y in 0..out_height {
        for x in 0..out_width {
            let src_point = inverse.transform(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            let pixel = match interpolation {
                Interpolation::Bilinear => sample_bilinear(source, src_point.x, src_point.y),
                Interpolation::Bicubic => sample_bicubic(source, src_point.x, src_point.y),
            };
            output.put_pixel(x, y, pixel);
        }
    }
    Ok(output)
}

fn clamp_coords(source: &RgbImage, x: i64, y: i64) -> (u32, u32) {
    (
        x.clamp(0, source.width() as i64 - 1) as u32,
        y.clamp(0, source.height() as i64 - 1) as u32,
    )
}

fn sample_bilinear(source: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let get = |dx: i64, dy: i64| -> [f64; 3] {
        let (cx, cy) = clamp_coords(source, x0 + dx, y0 + dy);
        let p = source.get_pixel(cx, cy);
        [p[0] as f64, p[1] as f64, p[2] as f64]
    };

    let p00 = get(0, 0);
    let p10 = get(1, 0);
    let p01 = get(0, 1);
    let p11 = get(1, 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Catmull-Rom bicubic sampling, used for the higher-quality capture path.
fn sample_bicubic(source: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let get = |dx: i64, dy: i64| -> [f64; 3] {
        let (cx, cy) = clamp_coords(source, x0 + dx, y0 + dy);
        let p = source.get_pixel(cx, cy);
        [p[0] as f64, p[1] as f64, p[2] as f64]
    };

    let mut out = [0u8; 3];
    for c in 0..3 {
        let mut rows = [0.0; 4];
        for (i, dy) in (-1..=2).enumerate() {
            let samples: [f64; 4] = [get(-1, dy)[c], get(0, dy)[c], get(1, dy)[c], get(2, dy)[c]];
            rows[i] = catmull_rom(samples, fx);
        }
        out[c] = catmull_rom(rows, fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

fn catmull_rom(p: [f64; 4], t: f64) -> f64 {
    let a = -0.5 * p[0] + 1.5 * p[1] - 1.5 * p[2] + 0.5 * p[3];
    let b = p[0] - 2.5 * p[1] + 2.0 * p[2] - 0.5 * p[3];
    let c = -0.5 * p[0] + 0.5 * p[2];
    let d = p[1];
    ((a * t + b) * t + c) * t + d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rectangle(width: u32, height: u32, corners: [(f64, f64); 4]) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));
        let quad = Quad::from_unordered(
            corners.map(|(x, y)| Point::new(x, y)),
            width.min(height) as f64,
        )
        .unwrap();
        for y in 0..height {
            for x in 0..width {
                let p = Point::new(x as f64, y as f64);
                if point_in_quad(&quad, p) {
                    img.put_pixel(x, y, Rgb([230, 230, 230]));
                }
            }
        }
        img
    }

    fn point_in_quad(quad: &Quad, p: Point) -> bool {
        let c = quad.corners();
        let mut sign = 0.0;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
            if cross.abs() < 1e-9 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    #[test]
    fn warped_corners_land_within_one_pixel_of_target() {
        let corners = [(150.0, 50.0), (650.0, 50.0), (650.0, 550.0), (150.0, 550.0)];
        let source = solid_rectangle(800, 600, corners);
        let quad = Quad::from_unordered(corners.map(|(x, y)| Point::new(x, y)), 600.0).unwrap();

        let warped = warp(&source, &quad, 500, 700, Interpolation::Bilinear).unwrap();
        assert_eq!(warped.width(), 500);
        assert_eq!(warped.height(), 700);

        let corner_px = warped.get_pixel(2, 2);
        assert!(corner_px[0] > 150);
    }

    #[test]
    fn rejects_zero_sized_output() {
        let corners = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let source = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let quad = Quad::from_unordered(corners.map(|(x, y)| Point::new(x, y)), 10.0).unwrap();
        assert!(warp(&source, &quad, 0, 10, Interpolation::Bilinear).is_err());
    }
}
