use thiserror::Error;

use crate::facs::channels::RawChannel;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the fusion pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("raw sample is missing channel `{0}`")]
    MissingChannel(RawChannel),

    #[error("channel `{channel}` carries non-finite value {value}")]
    NonFiniteChannel { channel: RawChannel, value: f32 },

    #[error("baseline not ready: calibration is still active")]
    BaselineNotReady,

    #[error("calibration window elapsed ({elapsed:.3}s) without any samples")]
    CalibrationStarved { elapsed: f32 },
}
