use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::facs::channels::{RawChannel, RawSample};

/// The five action units the detector works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionUnit {
    /// Cheek raiser.
    Au6,
    /// Lip corner puller.
    Au12,
    /// Brow lowerer.
    Au4,
    /// Lip corner depressor.
    Au15,
    /// Jaw drop.
    Au26,
}

impl ActionUnit {
    pub const ALL: [ActionUnit; 5] = [
        ActionUnit::Au6,
        ActionUnit::Au12,
        ActionUnit::Au4,
        ActionUnit::Au15,
        ActionUnit::Au26,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Au6 => "au6",
            Self::Au12 => "au12",
            Self::Au4 => "au4",
            Self::Au15 => "au15",
            Self::Au26 => "au26",
        }
    }

    /// Raw channels feeding this unit. Paired channels are averaged.
    pub fn sources(&self) -> &'static [RawChannel] {
        match self {
            Self::Au6 => &[RawChannel::CheekRaiserL, RawChannel::CheekRaiserR],
            Self::Au12 => &[RawChannel::LipCornerPullerL, RawChannel::LipCornerPullerR],
            Self::Au4 => &[RawChannel::BrowLowererL, RawChannel::BrowLowererR],
            Self::Au15 => &[
                RawChannel::LipCornerDepressorL,
                RawChannel::LipCornerDepressorR,
            ],
            Self::Au26 => &[RawChannel::JawDrop],
        }
    }
}

/// Action unit intensities (0-1). Also used for baselines and deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActionUnits {
    pub au6: f32,
    pub au12: f32,
    pub au4: f32,
    pub au15: f32,
    pub au26: f32,
}

impl ActionUnits {
    pub fn splat(v: f32) -> Self {
        Self {
            au6: v,
            au12: v,
            au4: v,
            au15: v,
            au26: v,
        }
    }

    pub fn get(&self, unit: ActionUnit) -> f32 {
        match unit {
            ActionUnit::Au6 => self.au6,
            ActionUnit::Au12 => self.au12,
            ActionUnit::Au4 => self.au4,
            ActionUnit::Au15 => self.au15,
            ActionUnit::Au26 => self.au26,
        }
    }

    pub fn get_mut(&mut self, unit: ActionUnit) -> &mut f32 {
        match unit {
            ActionUnit::Au6 => &mut self.au6,
            ActionUnit::Au12 => &mut self.au12,
            ActionUnit::Au4 => &mut self.au4,
            ActionUnit::Au15 => &mut self.au15,
            ActionUnit::Au26 => &mut self.au26,
        }
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        self.zip_with(self, |v, _| f(v))
    }

    /// Componentwise combination of two vectors.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut out = Self::default();
        for unit in ActionUnit::ALL {
            *out.get_mut(unit) = f(self.get(unit), other.get(unit));
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionUnit, f32)> + '_ {
        ActionUnit::ALL.into_iter().map(move |u| (u, self.get(u)))
    }
}

/// Collapses left/right raw channel pairs into action units.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelAggregator;

impl ChannelAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Average every source pair. A channel that is absent or non-finite
    /// fails the whole sample; finite values are clamped into [0, 1].
    pub fn aggregate(&self, sample: &RawSample) -> EngineResult<ActionUnits> {
        let mut aus = ActionUnits::default();
        for unit in ActionUnit::ALL {
            let sources = unit.sources();
            let mut sum = 0.0;
            for &channel in sources {
                let value = sample
                    .get(channel)
                    .ok_or(EngineError::MissingChannel(channel))?;
                if !value.is_finite() {
                    return Err(EngineError::NonFiniteChannel { channel, value });
                }
                sum += value.clamp(0.0, 1.0);
            }
            *aus.get_mut(unit) = sum / sources.len() as f32;
        }
        Ok(aus)
    }
}
