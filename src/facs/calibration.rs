use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::facs::features::ActionUnits;

/// Shortest calibration window accepted, in seconds.
pub const MIN_CALIBRATION_WINDOW: f32 = 0.1;

/// Neutral-face reference. Only the calibrator can produce one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    values: ActionUnits,
}

impl Baseline {
    /// All-zero baseline, used when calibration is skipped entirely.
    pub fn neutral() -> Self {
        Self {
            values: ActionUnits::default(),
        }
    }

    pub fn values(&self) -> &ActionUnits {
        &self.values
    }

    /// Activation above neutral, clamped to [0, 1] per unit.
    pub fn delta(&self, aus: &ActionUnits) -> ActionUnits {
        aus.zip_with(&self.values, |v, b| (v - b).clamp(0.0, 1.0))
    }
}

/// Running sums for one calibration attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSession {
    pub elapsed: f32,
    pub sums: ActionUnits,
    pub samples: u32,
}

impl CalibrationSession {
    fn accumulate(&mut self, aus: &ActionUnits) {
        self.sums = self.sums.zip_with(aus, |s, v| s + v);
        self.samples += 1;
    }

    fn mean(&self) -> Option<ActionUnits> {
        if self.samples == 0 {
            return None;
        }
        let n = self.samples as f32;
        Some(self.sums.map(|s| s / n))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CalibrationState {
    Calibrating(CalibrationSession),
    Ready(Baseline),
}

/// Result of feeding one tick into the calibrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
    /// Window still open.
    Calibrating,
    /// Window closed on this tick; the baseline is now in place.
    Completed(Baseline),
    /// Nothing to do, a baseline was already in place.
    Ready,
}

/// Two-state baseline calibrator: running mean over a fixed warm-up window.
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    window: f32,
    state: CalibrationState,
}

impl BaselineCalibrator {
    /// New calibrator that starts in the calibrating state.
    pub fn new(window_secs: f32) -> Self {
        Self {
            window: window_secs.max(MIN_CALIBRATION_WINDOW),
            state: CalibrationState::Calibrating(CalibrationSession::default()),
        }
    }

    /// New calibrator that is already ready with the given baseline.
    pub fn with_baseline(window_secs: f32, baseline: Baseline) -> Self {
        Self {
            window: window_secs.max(MIN_CALIBRATION_WINDOW),
            state: CalibrationState::Ready(baseline),
        }
    }

    pub fn window(&self) -> f32 {
        self.window
    }

    /// Drop any baseline and open a fresh session.
    pub fn begin(&mut self) {
        debug!("calibration session opened ({:.2}s window)", self.window);
        self.state = CalibrationState::Calibrating(CalibrationSession::default());
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrating(_))
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        match &self.state {
            CalibrationState::Ready(b) => Some(b),
            CalibrationState::Calibrating(_) => None,
        }
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        match &self.state {
            CalibrationState::Calibrating(s) => Some(s),
            CalibrationState::Ready(_) => None,
        }
    }

    /// Advance the open session by `dt` seconds, folding in `sample` when one
    /// arrived this tick. A window that closes with no samples yields
    /// `CalibrationStarved` and a fresh session is opened in its place.
    pub fn advance(
        &mut self,
        sample: Option<&ActionUnits>,
        dt: f32,
    ) -> EngineResult<CalibrationProgress> {
        let session = match &mut self.state {
            CalibrationState::Ready(_) => return Ok(CalibrationProgress::Ready),
            CalibrationState::Calibrating(session) => session,
        };

        session.elapsed += dt;
        if let Some(aus) = sample {
            session.accumulate(aus);
        }

        if session.elapsed < self.window {
            return Ok(CalibrationProgress::Calibrating);
        }

        match session.mean() {
            Some(values) => {
                let baseline = Baseline { values };
                info!(
                    "calibration complete after {} samples: au6={:.3} au12={:.3} au4={:.3} au15={:.3} au26={:.3}",
                    session.samples, values.au6, values.au12, values.au4, values.au15, values.au26
                );
                self.state = CalibrationState::Ready(baseline);
                Ok(CalibrationProgress::Completed(baseline))
            }
            None => {
                let elapsed = session.elapsed;
                self.state = CalibrationState::Calibrating(CalibrationSession::default());
                Err(EngineError::CalibrationStarved { elapsed })
            }
        }
    }

    /// Delta normalizer: only defined once a baseline exists.
    pub fn normalize(&self, aus: &ActionUnits) -> EngineResult<ActionUnits> {
        self.baseline()
            .map(|b| b.delta(aus))
            .ok_or(EngineError::BaselineNotReady)
    }
}
