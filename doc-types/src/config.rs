use serde::{Deserialize, Serialize};

/// Runtime configuration surface for the document-localization pipeline
/// (spec §6). Deserializable from YAML via `Config::from_yaml`, and
/// overridable field-by-field from CLI flags by callers that expose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auto_capture_enabled: bool,
    pub auto_capture_confidence_threshold: f64,
    pub stability_frames: u32,
    pub warmup_ms: u64,
    pub detection_max_width: u32,
    pub strategy_time_budget_ms: u64,
    pub skip_tier_thresholds: (u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_capture_enabled: true,
            auto_capture_confidence_threshold: 0.65,
            stability_frames: 20,
            warmup_ms: 1500,
            detection_max_width: 640,
            strategy_time_budget_ms: 25,
            skip_tier_thresholds: (5, 15),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = Config::default();
        assert!(cfg.auto_capture_enabled);
        assert_eq!(cfg.auto_capture_confidence_threshold, 0.65);
        assert_eq!(cfg.stability_frames, 20);
        assert_eq!(cfg.warmup_ms, 1500);
        assert_eq!(cfg.detection_max_width, 640);
        assert_eq!(cfg.strategy_time_budget_ms, 25);
        assert_eq!(cfg.skip_tier_thresholds, (5, 15));
    }

    #[test]
    fn partial_yaml_overrides_fall_back_to_defaults() {
        let cfg = Config::from_yaml("auto_capture_enabled: false\n").unwrap();
        assert!(!cfg.auto_capture_enabled);
        assert_eq!(cfg.stability_frames, Config::default().stability_frames);
    }

    #[test]
    fn roundtrips_through_yaml() {
        let cfg = Config::default();
        let yaml = cfg.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(cfg, parsed);
    }
}
