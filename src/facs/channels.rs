// Raw blendshape channels as reported by the headset face-tracking SDK.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawChannel {
    CheekRaiserL,
    CheekRaiserR,
    LipCornerPullerL,
    LipCornerPullerR,
    JawDrop,
    BrowLowererL,
    BrowLowererR,
    LipCornerDepressorL,
    LipCornerDepressorR,
}

impl RawChannel {
    pub const ALL: [RawChannel; 9] = [
        RawChannel::CheekRaiserL,
        RawChannel::CheekRaiserR,
        RawChannel::LipCornerPullerL,
        RawChannel::LipCornerPullerR,
        RawChannel::JawDrop,
        RawChannel::BrowLowererL,
        RawChannel::BrowLowererR,
        RawChannel::LipCornerDepressorL,
        RawChannel::LipCornerDepressorR,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheekRaiserL => "cheek_raiser_l",
            Self::CheekRaiserR => "cheek_raiser_r",
            Self::LipCornerPullerL => "lip_corner_puller_l",
            Self::LipCornerPullerR => "lip_corner_puller_r",
            Self::JawDrop => "jaw_drop",
            Self::BrowLowererL => "brow_lowerer_l",
            Self::BrowLowererR => "brow_lowerer_r",
            Self::LipCornerDepressorL => "lip_corner_depressor_l",
            Self::LipCornerDepressorR => "lip_corner_depressor_r",
        }
    }

    /// Parse a channel from its snake_case name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for RawChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame of raw channel weights. Channels the SDK did not report are
/// simply absent; nothing is defaulted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    weights: HashMap<RawChannel, f32>,
}

impl RawSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, channel: RawChannel, value: f32) -> Self {
        self.weights.insert(channel, value);
        self
    }

    pub fn without(mut self, channel: RawChannel) -> Self {
        self.weights.remove(&channel);
        self
    }

    pub fn set(&mut self, channel: RawChannel, value: f32) {
        self.weights.insert(channel, value);
    }

    pub fn get(&self, channel: RawChannel) -> Option<f32> {
        self.weights.get(&channel).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Every known channel set to the same value.
    pub fn uniform(value: f32) -> Self {
        RawChannel::ALL
            .into_iter()
            .fold(Self::new(), |s, c| s.with(c, value))
    }
}
