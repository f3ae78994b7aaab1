pub mod channels;
pub mod features;
pub mod calibration;
pub mod smoothing;
pub mod stability;

use serde::{Deserialize, Serialize};

use crate::facs::features::ActionUnits;

/// Mouth weight in the happy blend when the lip-corner delta is zero.
pub const MOUTH_WEIGHT_MIN: f32 = 0.15;
/// Mouth weight in the happy blend when the lip-corner delta is saturated.
pub const MOUTH_WEIGHT_MAX: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Angry,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 4] = [
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
        }
    }
}

/// One value per emotion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerEmotion<T> {
    pub happy: T,
    pub angry: T,
    pub sad: T,
    pub surprise: T,
}

pub type EmotionScores = PerEmotion<f32>;
pub type EmotionFlags = PerEmotion<bool>;

impl<T: Copy> PerEmotion<T> {
    pub fn splat(v: T) -> Self {
        Self {
            happy: v,
            angry: v,
            sad: v,
            surprise: v,
        }
    }

    pub fn get(&self, emotion: Emotion) -> T {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Angry => self.angry,
            Emotion::Sad => self.sad,
            Emotion::Surprise => self.surprise,
        }
    }

    pub fn get_mut(&mut self, emotion: Emotion) -> &mut T {
        match emotion {
            Emotion::Happy => &mut self.happy,
            Emotion::Angry => &mut self.angry,
            Emotion::Sad => &mut self.sad,
            Emotion::Surprise => &mut self.surprise,
        }
    }

    pub fn map<U>(&self, f: impl Fn(Emotion, T) -> U) -> PerEmotion<U> {
        PerEmotion {
            happy: f(Emotion::Happy, self.happy),
            angry: f(Emotion::Angry, self.angry),
            sad: f(Emotion::Sad, self.sad),
            surprise: f(Emotion::Surprise, self.surprise),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, T)> + '_ {
        Emotion::ALL.into_iter().map(move |e| (e, self.get(e)))
    }
}

/// `a + (b - a) * t` with `t` clamped to [0, 1].
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Share of the happy score carried by the lip corners. Grows linearly with
/// the lip-corner delta so a cheek-only smile still registers.
pub fn mouth_weight(au12_delta: f32) -> f32 {
    lerp(MOUTH_WEIGHT_MIN, MOUTH_WEIGHT_MAX, au12_delta)
}

/// Raw (unsmoothed) emotion scores from baseline-relative deltas.
pub fn fuse_emotions(delta: &ActionUnits) -> EmotionScores {
    let mouth_w = mouth_weight(delta.au12);
    let eye_w = 1.0 - mouth_w;

    EmotionScores {
        happy: (eye_w * delta.au6 + mouth_w * delta.au12).clamp(0.0, 1.0),
        angry: delta.au4.clamp(0.0, 1.0),
        sad: delta.au15.clamp(0.0, 1.0),
        surprise: delta.au26.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_mouth_weight_interpolation() {
        assert!(approx(mouth_weight(0.0), 0.15));
        assert!(approx(mouth_weight(1.0), 0.45));
        assert!(approx(mouth_weight(0.5), 0.30));
        // Delta is already clamped upstream, but lerp clamps t regardless.
        assert!(approx(mouth_weight(2.0), 0.45));
    }

    #[test]
    fn test_cheek_only_smile_registers() {
        let delta = ActionUnits {
            au6: 0.8,
            ..Default::default()
        };
        let s = fuse_emotions(&delta);
        assert!(approx(s.happy, 0.85 * 0.8));
        assert_eq!(s.angry, 0.0);
    }

    #[test]
    fn test_mouth_only_grimace_is_weak() {
        let delta = ActionUnits {
            au12: 0.9,
            ..Default::default()
        };
        let s = fuse_emotions(&delta);
        // mouth weight at 0.9 is 0.42
        assert!(approx(s.happy, 0.42 * 0.9));
        assert!(s.happy < 0.55);
    }

    #[test]
    fn test_direct_channels() {
        let delta = ActionUnits {
            au6: 0.0,
            au12: 0.0,
            au4: 0.6,
            au15: 0.3,
            au26: 1.0,
        };
        let s = fuse_emotions(&delta);
        assert_eq!(s.angry, 0.6);
        assert_eq!(s.sad, 0.3);
        assert_eq!(s.surprise, 1.0);
        assert_eq!(s.happy, 0.0);
    }

    #[test]
    fn test_per_emotion_accessors() {
        let mut flags = EmotionFlags::default();
        *flags.get_mut(Emotion::Sad) = true;
        let set: Vec<_> = flags.iter().filter(|(_, v)| *v).map(|(e, _)| e).collect();
        assert_eq!(set, vec![Emotion::Sad]);

        let doubled = EmotionScores::splat(0.25).map(|_, v| v * 2.0);
        assert_eq!(doubled, EmotionScores::splat(0.5));
    }
}
