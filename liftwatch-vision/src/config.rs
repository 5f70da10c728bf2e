//! Configuration for the monitoring pipelines

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Monitor configuration.
///
/// Environment/.env handling is the embedding application's job; it builds
/// this struct and hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fixed video source analyzed by both pipelines.
    pub video_path: PathBuf,
    /// ONNX detector model.
    pub model_path: PathBuf,
    /// Directory for batch-mode output videos.
    pub output_dir: PathBuf,
    /// Detections below this confidence are ignored by the pipelines.
    pub confidence_threshold: f32,
    /// Minimum video-time spacing between two events for one label.
    pub cooldown_secs: f64,
    /// Floor tag attached to events when the caller does not supply one.
    pub default_floor: String,
    /// Detector input resolution (width, height).
    pub input_size: (u32, u32),
    /// Class names in model output order.
    pub class_names: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".liftwatch");
                p.push("models");
                p.push("best.onnx");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models/best.onnx"));

        Self {
            video_path: PathBuf::from("./video/elevator.mp4"),
            model_path,
            output_dir: PathBuf::from("./output"),
            confidence_threshold: 0.6,
            cooldown_secs: liftwatch_core::DEFAULT_COOLDOWN_SECS,
            default_floor: "1F".to_string(),
            input_size: (640, 640),
            class_names: crate::models::DEFAULT_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MonitorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be within [0, 1]".to_string());
        }

        if self.cooldown_secs < 0.0 || !self.cooldown_secs.is_finite() {
            return Err("Cooldown must be a non-negative number of seconds".to_string());
        }

        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            return Err("Detector input size must be non-zero".to_string());
        }

        if self.input_size.0 > 7680 || self.input_size.1 > 4320 {
            return Err("Detector input size too large (max 8K)".to_string());
        }

        if self.class_names.is_empty() {
            return Err("At least one class name is required".to_string());
        }

        if self.default_floor.is_empty() {
            return Err("Default floor tag cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = MonitorConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_cooldown() {
        let mut config = MonitorConfig::default();
        config.cooldown_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_input_size() {
        let mut config = MonitorConfig::default();
        config.input_size = (0, 640);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = MonitorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.confidence_threshold, back.confidence_threshold);
        assert_eq!(config.default_floor, back.default_floor);
        assert_eq!(config.class_names, back.class_names);
    }
}
