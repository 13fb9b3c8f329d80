//! Top-level orchestration: refine corners, estimate aspect ratio, warp,
//! and recover orientation, given a full-resolution capture frame and a
//! detected quad (spec.md §4.7).

use doc_geometry::Quad;
use doc_types::Rotation;
use doc_vision::imageops::GrayImage;
use image::RgbImage;

use crate::aspect_ratio::{self, AspectRatioEstimate};
use crate::errors::Result;
use crate::warp::{self, Interpolation};

pub struct RectifyOutput {
    pub rectified: RgbImage,
    pub refined_quad: Quad,
    pub aspect_ratio: AspectRatioEstimate,
    pub auto_rotation_steps: Rotation,
}

/// Run the full capture-path rectification: sub-pixel refine, estimate
/// aspect ratio, warp with bicubic interpolation, recover orientation.
#[tracing::instrument(level = "debug", skip(source, quad))]
pub fn rectify(source: &RgbImage, quad: &Quad) -> Result<RectifyOutput> {
    rectify_with(source, quad, Interpolation::Bicubic)
}

/// Same as [`rectify`], but for preview/live paths, using bilinear
/// interpolation for speed.
pub fn rectify_preview(source: &RgbImage, quad: &Quad) -> Result<RectifyOutput> {
    rectify_with(source, quad, Interpolation::Bilinear)
}

fn rectify_with(source: &RgbImage, quad: &Quad, interpolation: Interpolation) -> Result<RectifyOutput> {
    let gray = to_gray(source);
    let shorter_side = (source.width().min(source.height())) as f64;
    let refined_quad = crate::corner_refine::refine(quad, &gray, shorter_side);

    let ar = aspect_ratio::estimate_without_intrinsics(&refined_quad);
    let ratio = if ar.is_trusted() { ar.ratio } else { raw_edge_ratio(&refined_quad) };

    let (out_width, out_height) = warp::output_dimensions(&refined_quad, ratio);
    let warped = warp::warp(source, &refined_quad, out_width, out_height, interpolation)?;

    let (auto_rotation_steps, rotated) = crate::orientation::recover(&warped);

    Ok(RectifyOutput {
        rectified: rotated,
        refined_quad,
        aspect_ratio: ar,
        auto_rotation_steps,
    })
}

fn raw_edge_ratio(quad: &Quad) -> f64 {
    let edges = quad.edge_lengths();
    let width = (edges[0] + edges[2]) / 2.0;
    let height = (edges[1] + edges[3]) / 2.0;
    (width.min(height) / width.max(height)).clamp(0.0, 1.0)
}

fn to_gray(source: &RgbImage) -> GrayImage {
    let (w, h) = (source.width() as usize, source.height() as usize);
    let mut data = vec![0u8; w * h];
    for (i, p) in source.pixels().enumerate() {
        let luma = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
        data[i] = luma.round().clamp(0.0, 255.0) as u8;
    }
    GrayImage::new(w, h, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_geometry::Point;
    use image::Rgb;

    #[test]
    fn rectifies_a_high_contrast_quad_to_a4_shape() {
        let mut source = RgbImage::from_pixel(800, 900, Rgb([20, 20, 20]));
        for y in 50..757 {
            for x in 150..650 {
                source.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        let quad = Quad::new(
            Point::new(150.0, 50.0),
            Point::new(650.0, 50.0),
            Point::new(650.0, 757.0),
            Point::new(150.0, 757.0),
            600.0,
        )
        .unwrap();

        let output = rectify(&source, &quad).unwrap();
        assert_eq!(output.aspect_ratio.snapped_format, Some(crate::aspect_ratio::KnownFormat::A4));
        let ratio = output.rectified.width() as f64 / output.rectified.height() as f64;
        assert!((ratio - 0.707).abs() < 0.05);
    }
}
