//! Hand-rolled single-channel image primitives shared by the preprocessing
//! strategies. Every operation works on a row-major `Vec<u8>` buffer with
//! an explicit width/height, mirroring the stride-aware loop style used
//! for low-level pixel operations elsewhere in this codebase, but without
//! a stride (buffers here are always tightly packed).

/// An owned, tightly-packed single-channel 8-bit image.
#[derive(Debug, Clone)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self::new(width, height, vec![value; width * height])
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    pub fn mean_stddev(&self) -> (f64, f64) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.data.len() as f64;
        let mean = self.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = self
            .data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        (mean, var.sqrt())
    }

    pub fn median(&self) -> u8 {
        let mut sorted = self.data.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }
}

/// Separable Gaussian blur with a square `radius*2+1` kernel.
pub fn gaussian_blur(img: &GrayImage, sigma: f64) -> GrayImage {
    let radius = (sigma * 3.0).ceil().max(1.0) as i64;
    let kernel = gaussian_kernel_1d(sigma, radius);

    let mut horiz = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let dx = k as i64 - radius;
                acc += img.get_clamped(x as i64 + dx, y as i64) as f64 * w;
            }
            horiz.set(x, y, acc.round().clamp(0.0, 255.0) as u8);
        }
    }

    let mut out = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let dy = k as i64 - radius;
                acc += horiz.get_clamped(x as i64, y as i64 + dy) as f64 * w;
            }
            out.set(x, y, acc.round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

fn gaussian_kernel_1d(sigma: f64, radius: i64) -> Vec<f64> {
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Horizontal and vertical Sobel gradients, returned as signed magnitudes.
pub fn sobel(img: &GrayImage) -> (Vec<f64>, Vec<f64>) {
    let mut gx = vec![0.0; img.width * img.height];
    let mut gy = vec![0.0; img.width * img.height];
    const KX: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const KY: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
    for y in 0..img.height {
        for x in 0..img.width {
            let mut sx = 0.0;
            let mut sy = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let px = img.get_clamped(x as i64 + kx - 1, y as i64 + ky - 1) as f64;
                    sx += px * KX[ky as usize][kx as usize];
                    sy += px * KY[ky as usize][kx as usize];
                }
            }
            gx[y * img.width + x] = sx;
            gy[y * img.width + x] = sy;
        }
    }
    (gx, gy)
}

/// Canny edge detector with explicit low/high thresholds and non-maximum
/// suppression, followed by simple hysteresis (no connected-component
/// tracing; a pixel survives if it is a local gradient maximum above
/// `high`, or above `low` and 8-connected to a pixel above `high`).
pub fn canny(img: &GrayImage, low: f64, high: f64) -> GrayImage {
    let (gx, gy) = sobel(img);
    let w = img.width;
    let h = img.height;
    let mag: Vec<f64> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&x, &y)| (x * x + y * y).sqrt())
        .collect();

    let mut suppressed = vec![0.0; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let idx = y * w + x;
            let angle = gy[idx].atan2(gx[idx]);
            let (dx, dy) = angle_to_offset(angle);
            let m = mag[idx];
            let m1 = mag[((y as i64 + dy) as usize) * w + (x as i64 + dx) as usize];
            let m2 = mag[((y as i64 - dy) as usize) * w + (x as i64 - dx) as usize];
            if m >= m1 && m >= m2 {
                suppressed[idx] = m;
            }
        }
    }

    let mut out = GrayImage::filled(w, h, 0);
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if suppressed[idx] >= high {
                out.set(x, y, 255);
            } else if suppressed[idx] >= low {
                let strong_neighbor = (-1..=1).any(|dy| {
                    (-1..=1).any(|dx| {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        nx >= 0
                            && ny >= 0
                            && (nx as usize) < w
                            && (ny as usize) < h
                            && suppressed[(ny as usize) * w + nx as usize] >= high
                    })
                });
                if strong_neighbor {
                    out.set(x, y, 255);
                }
            }
        }
    }
    out
}

fn angle_to_offset(angle: f64) -> (i64, i64) {
    let deg = angle.to_degrees().rem_euclid(180.0);
    if !(22.5..157.5).contains(&deg) {
        (1, 0)
    } else if deg < 67.5 {
        (1, 1)
    } else if deg < 112.5 {
        (0, 1)
    } else {
        (1, -1)
    }
}

/// 3x3 (or larger, odd `ksize`) morphological dilation on a binary image.
pub fn dilate(img: &GrayImage, ksize: usize) -> GrayImage {
    morph(img, ksize, true)
}

/// 3x3 (or larger, odd `ksize`) morphological erosion on a binary image.
pub fn erode(img: &GrayImage, ksize: usize) -> GrayImage {
    morph(img, ksize, false)
}

fn morph(img: &GrayImage, ksize: usize, dilate: bool) -> GrayImage {
    let r = (ksize / 2) as i64;
    let mut out = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut acc = if dilate { 0u8 } else { 255u8 };
            for dy in -r..=r {
                for dx in -r..=r {
                    let v = img.get_clamped(x as i64 + dx, y as i64 + dy);
                    acc = if dilate { acc.max(v) } else { acc.min(v) };
                }
            }
            out.set(x, y, acc);
        }
    }
    out
}

/// Morphological close: dilate then erode, used to heal small gaps in an
/// edge map (e.g. after spanning-line suppression).
pub fn morph_close(img: &GrayImage, ksize: usize) -> GrayImage {
    erode(&dilate(img, ksize), ksize)
}

/// Morphological open: erode then dilate, used to remove small noise
/// before edge extraction.
pub fn morph_open(img: &GrayImage, ksize: usize) -> GrayImage {
    dilate(&erode(img, ksize), ksize)
}

/// Morphological gradient: dilation minus erosion, highlighting edges.
pub fn morph_gradient(img: &GrayImage, ksize: usize) -> GrayImage {
    let d = dilate(img, ksize);
    let e = erode(img, ksize);
    let mut out = GrayImage::filled(img.width, img.height, 0);
    for i in 0..img.data.len() {
        out.data[i] = d.data[i].saturating_sub(e.data[i]);
    }
    out
}

/// Contrast-limited adaptive histogram equalization, tiled, with bilinear
/// blending disabled in favor of a simpler per-tile nearest mapping (the
/// loss of smoothing is acceptable since the output only feeds an edge
/// detector downstream).
pub fn clahe(img: &GrayImage, clip_limit: f64, tiles_x: usize, tiles_y: usize) -> GrayImage {
    let tile_w = img.width.div_ceil(tiles_x).max(1);
    let tile_h = img.height.div_ceil(tiles_y).max(1);
    let mut luts = vec![vec![0u8; 256]; tiles_x * tiles_y];

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(img.width);
            let y1 = (y0 + tile_h).min(img.height);
            let mut hist = [0u32; 256];
            let mut count = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get(x, y) as usize] += 1;
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }
            let clip = ((clip_limit * count as f64 / 256.0).max(1.0)) as u32;
            let mut excess = 0u32;
            for h in &mut hist {
                if *h > clip {
                    excess += *h - clip;
                    *h = clip;
                }
            }
            let redistribute = excess / 256;
            for h in &mut hist {
                *h += redistribute;
            }
            let mut cdf = 0u32;
            let lut = &mut luts[ty * tiles_x + tx];
            for (i, h) in hist.iter().enumerate() {
                cdf += h;
                lut[i] = ((cdf as f64 / count as f64) * 255.0).round() as u8;
            }
        }
    }

    let mut out = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let tx = (x / tile_w).min(tiles_x - 1);
            let ty = (y / tile_h).min(tiles_y - 1);
            let v = img.get(x, y);
            out.set(x, y, luts[ty * tiles_x + tx][v as usize]);
        }
    }
    out
}

/// Edge-preserving bilateral filter: a windowed weighted average where
/// both spatial distance and intensity difference attenuate the weight.
pub fn bilateral_filter(img: &GrayImage, radius: i64, sigma_space: f64, sigma_color: f64) -> GrayImage {
    let mut out = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let center = img.get(x, y) as f64;
            let mut acc = 0.0;
            let mut weight_sum = 0.0;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sample = img.get_clamped(x as i64 + dx, y as i64 + dy) as f64;
                    let spatial = -((dx * dx + dy * dy) as f64) / (2.0 * sigma_space * sigma_space);
                    let range = -((sample - center).powi(2)) / (2.0 * sigma_color * sigma_color);
                    let weight = (spatial + range).exp();
                    acc += sample * weight;
                    weight_sum += weight;
                }
            }
            out.set(x, y, (acc / weight_sum).round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

/// Difference of Gaussians: blur at `sigma_narrow`, blur at `sigma_wide`,
/// subtract, rescale to 0..255. Acts as a bandpass filter.
pub fn difference_of_gaussians(img: &GrayImage, sigma_narrow: f64, sigma_wide: f64) -> GrayImage {
    let narrow = gaussian_blur(img, sigma_narrow);
    let wide = gaussian_blur(img, sigma_wide);
    let mut diffs = vec![0.0; img.data.len()];
    let mut max_abs = 1e-6_f64;
    for i in 0..img.data.len() {
        let d = narrow.data[i] as f64 - wide.data[i] as f64;
        diffs[i] = d;
        max_abs = max_abs.max(d.abs());
    }
    let mut out = GrayImage::filled(img.width, img.height, 0);
    for (i, &d) in diffs.iter().enumerate() {
        out.data[i] = (((d / max_abs) * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Local-mean adaptive threshold: each pixel is thresholded against the
/// mean of its `block_size`-wide neighborhood minus `c`.
pub fn adaptive_threshold_mean(img: &GrayImage, block_size: i64, c: f64) -> GrayImage {
    let r = block_size / 2;
    let mut out = GrayImage::filled(img.width, img.height, 0);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut sum = 0i64;
            let mut n = 0i64;
            for dy in -r..=r {
                for dx in -r..=r {
                    sum += img.get_clamped(x as i64 + dx, y as i64 + dy) as i64;
                    n += 1;
                }
            }
            let mean = sum as f64 / n as f64;
            let v = img.get(x, y) as f64;
            out.set(x, y, if v > mean - c { 255 } else { 0 });
        }
    }
    out
}

/// Threshold so the top `fraction` of pixels (by value) survive.
pub fn percentile_threshold(values: &[f64], width: usize, height: usize, fraction: f64) -> GrayImage {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = (((1.0 - fraction) * sorted.len() as f64) as usize).min(sorted.len() - 1);
    let threshold = sorted[idx];
    let mut out = GrayImage::filled(width, height, 0);
    for (i, &v) in values.iter().enumerate() {
        if v >= threshold {
            out.data[i] = 255;
        }
    }
    out
}

/// Rescale an arbitrary f64 field to 0..255.
pub fn normalize_to_u8(values: &[f64]) -> Vec<u8> {
    let max = values.iter().cloned().fold(0.0_f64, f64::max).max(1e-9);
    values
        .iter()
        .map(|&v| ((v / max) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}
