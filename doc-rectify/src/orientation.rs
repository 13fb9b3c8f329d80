//! Orientation recovery: chooses a post-rotation so the rectified
//! document reads portrait with ink concentrated toward the top-left.

use doc_types::Rotation;
use image::RgbImage;

/// Analyze `rectified` and return the rotation that should be applied on
/// top of whatever orientation it is already in, plus the resulting
/// image. Applying this twice is a no-op: the second call always picks
/// `Rotation::Deg0` because the ink distribution is already favorable.
#[tracing::instrument(level = "debug", skip(rectified))]
pub fn recover(rectified: &RgbImage) -> (Rotation, RgbImage) {
    let candidates = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    let mut best = Rotation::Deg0;
    let mut best_score = f64::NEG_INFINITY;

    for rotation in candidates {
        let rotated = apply_rotation(rectified, rotation);
        let score = top_left_ink_score(&rotated);
        if score > best_score {
            best_score = score;
            best = rotation;
        }
    }

    (best, apply_rotation(rectified, best))
}

/// Score how strongly ink is concentrated toward the top-left quadrant
/// relative to a uniform distribution; higher is more "correctly
/// oriented" under the portrait/top-left-ink heuristic.
fn top_left_ink_score(img: &RgbImage) -> f64 {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return 0.0;
    }

    let mut quadrant_ink = [0.0f64; 4]; // TL, TR, BL, BR
    let mut quadrant_count = [0u64; 4];

    for y in 0..h {
        for x in 0..w {
            let p = img.get_pixel(x, y);
            let luma = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
            let darkness = 255.0 - luma;
            let quadrant = match (x < w / 2, y < h / 2) {
                (true, true) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (false, false) => 3,
            };
            quadrant_ink[quadrant] += darkness;
            quadrant_count[quadrant] += 1;
        }
    }

    let mean_ink: [f64; 4] = std::array::from_fn(|i| {
        if quadrant_count[i] == 0 {
            0.0
        } else {
            quadrant_ink[i] / quadrant_count[i] as f64
        }
    });

    // Portrait bias: reward taller-than-wide outputs slightly, since a
    // correctly oriented page is usually portrait.
    let portrait_bonus = if h >= w { 1.0 } else { 0.0 };

    // Top-left should carry the most ink relative to the other three
    // quadrants combined.
    let others = mean_ink[1] + mean_ink[2] + mean_ink[3];
    mean_ink[0] - others / 3.0 + portrait_bonus
}

fn apply_rotation(img: &RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::Deg0 => img.clone(),
        Rotation::Deg90 => rotate90(img),
        Rotation::Deg180 => rotate180(img),
        Rotation::Deg270 => rotate270(img),
    }
}

fn rotate90(img: &RgbImage) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    let mut out = RgbImage::new(h, w);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(h - 1 - y, x, *img.get_pixel(x, y));
        }
    }
    out
}

fn rotate180(img: &RgbImage) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(w - 1 - x, h - 1 - y, *img.get_pixel(x, y));
        }
    }
    out
}

fn rotate270(img: &RgbImage) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    let mut out = RgbImage::new(h, w);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(y, w - 1 - x, *img.get_pixel(x, y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn top_left_weighted_document(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, Rgb([240, 240, 240]));
        for y in 0..(h / 3) {
            for x in 0..(w / 3) {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        img
    }

    #[test]
    fn already_correctly_oriented_document_is_unchanged() {
        let img = top_left_weighted_document(100, 140);
        let (rotation, _) = recover(&img);
        assert_eq!(rotation, Rotation::Deg0);
    }

    #[test]
    fn recovery_is_idempotent() {
        let img = top_left_weighted_document(100, 140);
        let (_, once) = recover(&img);
        let (rotation_twice, _) = recover(&once);
        assert_eq!(rotation_twice, Rotation::Deg0);
    }

    #[test]
    fn upside_down_document_is_rotated_back() {
        let img = top_left_weighted_document(100, 140);
        let flipped = rotate180(&img);
        let (rotation, _) = recover(&flipped);
        assert_eq!(rotation, Rotation::Deg180);
    }
}
