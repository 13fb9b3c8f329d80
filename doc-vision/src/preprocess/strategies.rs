use doc_types::Strategy;

use super::directional_gradient;
use super::StrategyInput;
use crate::imageops::{
    adaptive_threshold_mean, bilateral_filter, canny, clahe, difference_of_gaussians,
    gaussian_blur, morph_close, morph_gradient, morph_open, normalize_to_u8, percentile_threshold,
    sobel, GrayImage,
};

/// Run the named strategy, producing a same-size binary edge map.
#[tracing::instrument(level = "debug", skip(input), fields(strategy = ?strategy))]
pub fn run_strategy(strategy: Strategy, input: &StrategyInput<'_>) -> GrayImage {
    let luma = input.luma;
    match strategy {
        Strategy::Standard => standard(luma),
        Strategy::ClaheEnhanced => clahe_enhanced(luma),
        Strategy::SaturationChannel => saturation_channel(input),
        Strategy::Bilateral => bilateral(luma),
        Strategy::HeavyMorph => heavy_morph(luma),
        Strategy::Dog => dog(luma),
        Strategy::GradientMagnitude => gradient_magnitude(luma),
        Strategy::LabClahe => lab_clahe(input),
        Strategy::MultichannelFusion => multichannel_fusion(input),
        Strategy::AdaptiveThreshold => adaptive_threshold(luma),
        Strategy::DirectionalGradient => directional_gradient::run(luma),
    }
}

fn standard(img: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur(img, 9.0 / 6.0);
    let median = blurred.median() as f64;
    let edges = canny(&blurred, 0.67 * median, 1.33 * median);
    morph_close(&edges, 3)
}

fn clahe_enhanced(img: &GrayImage) -> GrayImage {
    let enhanced = clahe(img, 3.0, 4, 4);
    let edges = canny(&enhanced, 30.0, 60.0);
    morph_close(&edges, 3)
}

fn saturation_channel(input: &StrategyInput<'_>) -> GrayImage {
    let Some(chroma) = input.chroma else {
        // No color plane available; degrade gracefully to an empty map
        // rather than panicking, since SceneAnalyzer only selects this
        // strategy when chroma is present.
        return GrayImage::filled(input.luma.width, input.luma.height, 0);
    };
    let saturation = saturation_from_chroma(input.luma, chroma);
    let blurred = gaussian_blur(&saturation, 1.5);
    let median = blurred.median() as f64;
    canny(&blurred, 0.67 * median, 1.33 * median)
}

/// Derives a pseudo-saturation channel from interleaved U/V chroma: the
/// magnitude of the chroma vector around its neutral midpoint (128).
fn saturation_from_chroma(luma: &GrayImage, chroma: doc_types::Chroma<'_>) -> GrayImage {
    let mut data = vec![0u8; luma.width * luma.height];
    for i in 0..data.len() {
        let u = chroma.data.get(i * 2).copied().unwrap_or(128) as f64 - 128.0;
        let v = chroma.data.get(i * 2 + 1).copied().unwrap_or(128) as f64 - 128.0;
        data[i] = (u * u + v * v).sqrt().min(255.0) as u8;
    }
    GrayImage::new(luma.width, luma.height, data)
}

fn bilateral(img: &GrayImage) -> GrayImage {
    let filtered = bilateral_filter(img, 4, 10.0, 25.0);
    let median = filtered.median() as f64;
    canny(&filtered, 0.67 * median, 1.33 * median)
}

fn heavy_morph(img: &GrayImage) -> GrayImage {
    let opened = morph_open(img, 7);
    let closed = morph_close(&opened, 7);
    let median = closed.median() as f64;
    canny(&closed, 0.67 * median, 1.33 * median)
}

fn dog(img: &GrayImage) -> GrayImage {
    let bandpassed = difference_of_gaussians(img, 0.5, 3.5);
    let edges = canny(&bandpassed, 10.0, 30.0);
    morph_close(&edges, 3)
}

fn gradient_magnitude(img: &GrayImage) -> GrayImage {
    let (gx, gy) = sobel(img);
    let mag: Vec<f64> = gx.iter().zip(gy.iter()).map(|(&x, &y)| (x * x + y * y).sqrt()).collect();
    percentile_threshold(&mag, img.width, img.height, 0.05)
}

fn lab_clahe(input: &StrategyInput<'_>) -> GrayImage {
    // Without a full color pipeline, the L channel of Lab is approximated
    // by the luma plane itself (their perceptual intent mostly agrees).
    let enhanced = clahe(input.luma, 6.0, 2, 2);
    canny(&enhanced, 30.0, 60.0)
}

fn multichannel_fusion(input: &StrategyInput<'_>) -> GrayImage {
    let luma_edges = canny(input.luma, 0.67 * input.luma.median() as f64, 1.33 * input.luma.median() as f64);
    let Some(chroma) = input.chroma else {
        return luma_edges;
    };
    let saturation = saturation_from_chroma(input.luma, chroma);
    let chroma_edges = canny(&saturation, 0.67 * saturation.median() as f64, 1.33 * saturation.median() as f64);

    let mut out = GrayImage::filled(input.luma.width, input.luma.height, 0);
    for i in 0..out.data.len() {
        out.data[i] = if luma_edges.data[i] == 255 || chroma_edges.data[i] == 255 {
            255
        } else {
            0
        };
    }
    out
}

fn adaptive_threshold(img: &GrayImage) -> GrayImage {
    let thresholded = adaptive_threshold_mean(img, 15, 5.0);
    morph_gradient(&thresholded, 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_types::Strategy;

    fn gradient_image(n: usize) -> GrayImage {
        let mut data = vec![0u8; n * n];
        for y in 0..n {
            for x in 0..n {
                data[y * n + x] = if x < n / 2 { 20 } else { 220 };
            }
        }
        GrayImage::new(n, n, data)
    }

    #[test]
    fn all_strategies_return_same_size_binary_maps() {
        let luma = gradient_image(48);
        let input = StrategyInput { luma: &luma, chroma: None };
        let strategies = [
            Strategy::Standard,
            Strategy::ClaheEnhanced,
            Strategy::Bilateral,
            Strategy::HeavyMorph,
            Strategy::Dog,
            Strategy::GradientMagnitude,
            Strategy::LabClahe,
            Strategy::MultichannelFusion,
            Strategy::AdaptiveThreshold,
            Strategy::DirectionalGradient,
        ];
        for strategy in strategies {
            let out = run_strategy(strategy, &input);
            assert_eq!((out.width, out.height), (48, 48), "{strategy:?}");
            assert!(out.data.iter().all(|&v| v == 0 || v == 255), "{strategy:?}");
        }
    }

    #[test]
    fn saturation_channel_degrades_gracefully_without_chroma() {
        let luma = gradient_image(32);
        let input = StrategyInput { luma: &luma, chroma: None };
        let out = run_strategy(Strategy::SaturationChannel, &input);
        assert!(out.data.iter().all(|&v| v == 0));
    }
}
