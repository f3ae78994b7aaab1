pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod facs;
pub mod recorder;
pub mod replay;

pub use crate::config::{ConfigError, EngineConfig};
pub use crate::core::{EmotionEngine, EngineOutput};
pub use crate::error::{EngineError, EngineResult};
pub use crate::facs::channels::{RawChannel, RawSample};
pub use crate::facs::{Emotion, EmotionFlags, EmotionScores, PerEmotion};
