/// One of the ~11 named preprocessing passes the Preprocessor can run,
/// each producing a binary edge map from a grayscale (and optionally
/// color) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Standard,
    ClaheEnhanced,
    SaturationChannel,
    Bilateral,
    HeavyMorph,
    Dog,
    GradientMagnitude,
    LabClahe,
    MultichannelFusion,
    AdaptiveThreshold,
    DirectionalGradient,
}

impl Strategy {
    pub fn requires_chroma(self) -> bool {
        matches!(
            self,
            Strategy::SaturationChannel | Strategy::MultichannelFusion
        )
    }
}

/// Output of the SceneAnalyzer: luminance statistics and the ordered list
/// of preprocessing strategies the Preprocessor should attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescriptor {
    pub mean_luminance: f64,
    pub stddev_luminance: f64,
    pub is_low_contrast: bool,
    pub is_white_on_white: bool,
    pub is_high_texture: bool,
    pub strategies: Vec<Strategy>,
}

const LOW_CONTRAST_STDDEV: f64 = 40.0;
const WHITE_ON_WHITE_MEAN: f64 = 180.0;
const WHITE_ON_WHITE_STDDEV: f64 = 35.0;

impl SceneDescriptor {
    /// Classify a frame from its luminance mean/stddev and whether chroma
    /// planes are available, applying the routing rules in order (first
    /// match wins).
    pub fn classify(mean_luminance: f64, stddev_luminance: f64, has_chroma: bool) -> Self {
        let is_low_contrast = stddev_luminance < LOW_CONTRAST_STDDEV;
        let is_white_on_white =
            mean_luminance > WHITE_ON_WHITE_MEAN && stddev_luminance < WHITE_ON_WHITE_STDDEV;

        let strategies = if is_white_on_white {
            vec![
                Strategy::Dog,
                Strategy::DirectionalGradient,
                Strategy::GradientMagnitude,
                Strategy::LabClahe,
                Strategy::ClaheEnhanced,
                Strategy::MultichannelFusion,
                Strategy::AdaptiveThreshold,
            ]
        } else if is_low_contrast {
            vec![
                Strategy::Standard,
                Strategy::ClaheEnhanced,
                Strategy::Dog,
                Strategy::GradientMagnitude,
            ]
        } else {
            let mut s = vec![Strategy::Standard, Strategy::ClaheEnhanced];
            if has_chroma {
                s.push(Strategy::SaturationChannel);
            }
            s.push(Strategy::Bilateral);
            s.push(Strategy::HeavyMorph);
            s
        };

        Self {
            mean_luminance,
            stddev_luminance,
            is_low_contrast,
            is_white_on_white,
            is_high_texture: false,
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_on_white_routes_to_low_contrast_bandpass_strategies() {
        let scene = SceneDescriptor::classify(200.0, 20.0, false);
        assert!(scene.is_white_on_white);
        assert_eq!(scene.strategies[0], Strategy::Dog);
    }

    #[test]
    fn low_contrast_but_not_white_routes_standard_first() {
        let scene = SceneDescriptor::classify(120.0, 25.0, false);
        assert!(scene.is_low_contrast);
        assert!(!scene.is_white_on_white);
        assert_eq!(scene.strategies[0], Strategy::Standard);
    }

    #[test]
    fn normal_scene_includes_saturation_channel_only_with_chroma() {
        let without_chroma = SceneDescriptor::classify(120.0, 60.0, false);
        assert!(!without_chroma.strategies.contains(&Strategy::SaturationChannel));

        let with_chroma = SceneDescriptor::classify(120.0, 60.0, true);
        assert!(with_chroma.strategies.contains(&Strategy::SaturationChannel));
    }
}
