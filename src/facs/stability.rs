//! Hold-time hysteresis over smoothed emotion scores.
//!
//! A score has to stay at or above its threshold for `min_hold` seconds
//! without interruption before the emotion counts as confirmed. Confirmation
//! latches until `reset`, which the engine calls on every recalibration.

use tracing::debug;

use crate::facs::{Emotion, EmotionFlags, EmotionScores, PerEmotion};

#[derive(Debug, Clone)]
pub struct StabilityDetector {
    thresholds: EmotionScores,
    min_hold: f32,
    hold: PerEmotion<f32>,
    above: EmotionFlags,
    confirmed: EmotionFlags,
}

impl StabilityDetector {
    pub fn new(thresholds: EmotionScores, min_hold_secs: f32) -> Self {
        Self {
            thresholds,
            min_hold: min_hold_secs.max(0.0),
            hold: PerEmotion::splat(0.0),
            above: EmotionFlags::default(),
            confirmed: EmotionFlags::default(),
        }
    }

    pub fn thresholds(&self) -> &EmotionScores {
        &self.thresholds
    }

    pub fn min_hold(&self) -> f32 {
        self.min_hold
    }

    /// Continuous time each score has spent at or above threshold.
    pub fn hold_times(&self) -> &PerEmotion<f32> {
        &self.hold
    }

    /// Latched flags: set once the hold time is reached, cleared only by `reset`.
    pub fn confirmed(&self) -> &EmotionFlags {
        &self.confirmed
    }

    /// Unlatched view: score at threshold on the last update and hold time
    /// at or past the minimum.
    pub fn stable(&self) -> EmotionFlags {
        self.hold
            .map(|emotion, h| self.above.get(emotion) && h >= self.min_hold)
    }

    pub fn update(&mut self, scores: &EmotionScores, dt: f32) -> &EmotionFlags {
        for emotion in Emotion::ALL {
            let above = scores.get(emotion) >= self.thresholds.get(emotion);
            *self.above.get_mut(emotion) = above;

            let hold = self.hold.get_mut(emotion);
            if above {
                *hold += dt;
            } else {
                *hold = 0.0;
            }

            // A zero minimum hold must not confirm a score under threshold.
            if above && *hold >= self.min_hold && !self.confirmed.get(emotion) {
                *self.confirmed.get_mut(emotion) = true;
                debug!("{} confirmed after {:.3}s hold", emotion.as_str(), *hold);
            }
        }
        &self.confirmed
    }

    pub fn reset(&mut self) {
        self.hold = PerEmotion::splat(0.0);
        self.above = EmotionFlags::default();
        self.confirmed = EmotionFlags::default();
    }
}
