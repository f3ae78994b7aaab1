use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::facs::EmotionScores;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Detector tuning. Every field has a default, so partial JSON files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// EMA factor in (0, 1]; smaller is smoother.
    pub ema_alpha: f32,
    /// Seconds a score must stay above threshold before it is confirmed.
    pub min_hold_secs: f32,
    /// Per-emotion score thresholds. All four must be given when present.
    pub thresholds: EmotionScores,
    /// Neutral-face warm-up window. Floored to 0.1s.
    pub calibration_window_secs: f32,
    /// Start in calibration. When false the engine starts ready with an
    /// all-zero baseline.
    pub auto_calibrate_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.18,
            min_hold_secs: 0.20,
            thresholds: EmotionScores {
                happy: 0.55,
                angry: 0.55,
                sad: 0.55,
                surprise: 0.60,
            },
            calibration_window_secs: 1.0,
            auto_calibrate_on_start: true,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if !self.min_hold_secs.is_finite() || self.min_hold_secs < 0.0 {
            return Err(ConfigError::Validation(format!(
                "min_hold_secs must be a non-negative number, got {}",
                self.min_hold_secs
            )));
        }
        if !self.calibration_window_secs.is_finite() || self.calibration_window_secs < 0.0 {
            return Err(ConfigError::Validation(format!(
                "calibration_window_secs must be a non-negative number, got {}",
                self.calibration_window_secs
            )));
        }
        for (emotion, t) in self.thresholds.iter() {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::Validation(format!(
                    "threshold for {} must be in [0, 1], got {}",
                    emotion.as_str(),
                    t
                )));
            }
        }
        Ok(())
    }
}
