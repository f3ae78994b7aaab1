//! First-order exponential moving average over the four emotion scores.

use crate::facs::{lerp, Emotion, EmotionScores};

#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f32,
    scores: EmotionScores,
}

impl EmaSmoother {
    /// `alpha` is clamped into (0, 1]; smaller is smoother.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            scores: EmotionScores::default(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn scores(&self) -> &EmotionScores {
        &self.scores
    }

    pub fn update(&mut self, raw: &EmotionScores) -> &EmotionScores {
        for emotion in Emotion::ALL {
            let s = self.scores.get_mut(emotion);
            *s = lerp(*s, raw.get(emotion), self.alpha).clamp(0.0, 1.0);
        }
        &self.scores
    }
}
