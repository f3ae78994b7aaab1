//! Tick-driven expression engine.
//!
//! Owns the whole pipeline: aggregation, baseline calibration, delta
//! normalization, fusion, smoothing and hold-time detection. The host feeds
//! samples with `submit_sample`, drives time with `tick`, and reads the
//! returned `EngineOutput`. Nothing inside is reachable for mutation from
//! outside.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::facs::{
    calibration::{Baseline, BaselineCalibrator, CalibrationProgress},
    channels::RawSample,
    features::{ActionUnits, ChannelAggregator},
    fuse_emotions,
    smoothing::EmaSmoother,
    stability::StabilityDetector,
    EmotionFlags, EmotionScores, PerEmotion,
};

/// Snapshot handed to consumers after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOutput {
    /// Engine clock at the end of the tick, in seconds.
    pub time: f64,
    /// Duration actually applied by this tick.
    pub dt: f32,
    pub calibrating: bool,
    /// Smoothed scores; absent while calibrating.
    pub scores: Option<EmotionScores>,
    /// Latched confirmations, cleared only by recalibration.
    pub confirmed: EmotionFlags,
    /// Hold time currently at or past the minimum.
    pub stable: EmotionFlags,
    /// Action units of the sample consumed this tick, if any.
    pub action_units: Option<ActionUnits>,
}

#[derive(Debug, Clone)]
pub struct EmotionEngine {
    config: EngineConfig,
    aggregator: ChannelAggregator,
    calibrator: BaselineCalibrator,
    smoother: EmaSmoother,
    stability: StabilityDetector,
    pending: Option<ActionUnits>,
    recalibrate: bool,
    clock: f64,
}

impl EmotionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let calibrator = if config.auto_calibrate_on_start {
            BaselineCalibrator::new(config.calibration_window_secs)
        } else {
            BaselineCalibrator::with_baseline(config.calibration_window_secs, Baseline::neutral())
        };

        info!(
            "engine created: alpha={:.2} hold={:.2}s window={:.2}s calibrating={}",
            config.ema_alpha,
            config.min_hold_secs,
            calibrator.window(),
            calibrator.is_calibrating()
        );

        Self {
            aggregator: ChannelAggregator::new(),
            smoother: EmaSmoother::new(config.ema_alpha),
            stability: StabilityDetector::new(config.thresholds, config.min_hold_secs),
            calibrator,
            config,
            pending: None,
            recalibrate: false,
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_calibrating()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.calibrator.baseline()
    }

    pub fn hold_times(&self) -> &PerEmotion<f32> {
        self.stability.hold_times()
    }

    /// Aggregate and queue a sample for the next tick. A rejected sample
    /// leaves the engine untouched; a newer sample replaces an unconsumed one.
    pub fn submit_sample(&mut self, sample: &RawSample) -> EngineResult<()> {
        let aus = self.aggregator.aggregate(sample)?;
        if self.pending.replace(aus).is_some() {
            trace!("unconsumed sample replaced");
        }
        Ok(())
    }

    /// Start a new calibration epoch at the beginning of the next tick.
    pub fn request_recalibration(&mut self) {
        if !self.recalibrate {
            debug!("recalibration requested");
        }
        self.recalibrate = true;
    }

    pub fn tick(&mut self, dt: f32) -> EngineOutput {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!("ignoring invalid tick duration {}", dt);
            0.0
        };
        self.clock += f64::from(dt);

        if std::mem::take(&mut self.recalibrate) {
            info!("recalibrating at t={:.3}s", self.clock);
            self.calibrator.begin();
            self.stability.reset();
        }

        let sample = self.pending.take();

        match self.calibrator.advance(sample.as_ref(), dt) {
            Ok(CalibrationProgress::Calibrating) => return self.output(sample, dt),
            Ok(CalibrationProgress::Completed(_)) | Ok(CalibrationProgress::Ready) => {}
            Err(EngineError::CalibrationStarved { elapsed }) => {
                warn!(
                    "no samples during {:.2}s calibration window, restarting",
                    elapsed
                );
                return self.output(sample, dt);
            }
            Err(e) => {
                warn!("calibration error: {}", e);
                return self.output(sample, dt);
            }
        }

        if let Some(aus) = &sample {
            match self.calibrator.normalize(aus) {
                Ok(delta) => {
                    let raw = fuse_emotions(&delta);
                    self.smoother.update(&raw);
                }
                Err(e) => warn!("skipping fusion: {}", e),
            }
        }

        // Without a fresh sample the previous scores are held for this tick.
        self.stability.update(self.smoother.scores(), dt);

        self.output(sample, dt)
    }

    fn output(&self, sample: Option<ActionUnits>, dt: f32) -> EngineOutput {
        let calibrating = self.calibrator.is_calibrating();
        EngineOutput {
            time: self.clock,
            dt,
            calibrating,
            scores: (!calibrating).then(|| *self.smoother.scores()),
            confirmed: *self.stability.confirmed(),
            stable: self.stability.stable(),
            action_units: sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facs::channels::RawChannel;

    fn face(cheek: f32, lip: f32) -> RawSample {
        RawSample::uniform(0.0)
            .with(RawChannel::CheekRaiserL, cheek)
            .with(RawChannel::CheekRaiserR, cheek)
            .with(RawChannel::LipCornerPullerL, lip)
            .with(RawChannel::LipCornerPullerR, lip)
    }

    fn calibrate(engine: &mut EmotionEngine, sample: &RawSample, dt: f32) {
        for _ in 0..100 {
            engine.submit_sample(sample).unwrap();
            if !engine.tick(dt).calibrating {
                return;
            }
        }
        panic!("calibration never completed");
    }

    #[test]
    fn test_happy_confirmation_end_to_end() {
        let mut engine = EmotionEngine::new(EngineConfig {
            ema_alpha: 1.0,
            min_hold_secs: 0.2,
            ..EngineConfig::default()
        });

        calibrate(&mut engine, &face(0.05, 0.1), 0.05);
        let baseline = engine.baseline().unwrap().values();
        assert!((baseline.au12 - 0.1).abs() < 1e-5);

        // Lip corners alone (delta 0.8) only reach 0.8 * 0.39 = 0.312 under
        // the dynamic weighting, so the cheeks are raised too.
        let smile = face(0.85, 0.9);
        let mut outputs = Vec::new();
        for _ in 0..5 {
            engine.submit_sample(&smile).unwrap();
            outputs.push(engine.tick(0.05));
        }

        for out in &outputs {
            assert!(out.scores.unwrap().happy >= 0.55);
        }
        // 0.15s held
        assert!(!outputs[2].confirmed.happy);
        // 0.25s held
        assert!(outputs[4].confirmed.happy);
        assert!(outputs[4].stable.happy);
        let first = outputs.iter().position(|o| o.confirmed.happy).unwrap();
        assert!(first >= 3);
        assert!(outputs[first..].iter().all(|o| o.confirmed.happy));
        assert!(!outputs[4].confirmed.angry);
    }

    #[test]
    fn test_scores_hidden_while_calibrating() {
        let mut engine = EmotionEngine::new(EngineConfig::default());
        engine.submit_sample(&face(0.9, 0.9)).unwrap();
        let out = engine.tick(0.1);
        assert!(out.calibrating);
        assert!(out.scores.is_none());
        assert!(out.action_units.is_some());
        assert_eq!(out.confirmed, EmotionFlags::default());
    }

    #[test]
    fn test_recalibration_resets_hold_on_next_tick() {
        let mut engine = EmotionEngine::new(EngineConfig {
            ema_alpha: 1.0,
            auto_calibrate_on_start: false,
            ..EngineConfig::default()
        });

        for _ in 0..10 {
            engine.submit_sample(&RawSample::uniform(1.0)).unwrap();
            engine.tick(0.1);
        }
        assert!(engine.hold_times().happy > 0.5);
        assert!(engine.tick(0.0).confirmed.surprise);

        engine.request_recalibration();
        engine.request_recalibration();
        // Not applied until the next tick.
        assert!(!engine.is_calibrating());

        engine.submit_sample(&RawSample::uniform(1.0)).unwrap();
        let out = engine.tick(0.1);
        assert!(out.calibrating);
        assert_eq!(*engine.hold_times(), PerEmotion::splat(0.0));
        assert_eq!(out.confirmed, EmotionFlags::default());
    }

    #[test]
    fn test_rejected_sample_changes_nothing() {
        let mut engine = EmotionEngine::new(EngineConfig {
            auto_calibrate_on_start: false,
            ..EngineConfig::default()
        });
        engine.submit_sample(&face(0.5, 0.5)).unwrap();

        let bad = face(0.5, 0.5).without(RawChannel::JawDrop);
        assert_eq!(
            engine.submit_sample(&bad),
            Err(EngineError::MissingChannel(RawChannel::JawDrop))
        );

        // The earlier valid sample is still the one consumed.
        let out = engine.tick(0.1);
        assert!((out.action_units.unwrap().au6 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_starved_calibration_keeps_calibrating() {
        let mut engine = EmotionEngine::new(EngineConfig {
            calibration_window_secs: 0.2,
            ..EngineConfig::default()
        });
        for _ in 0..10 {
            let out = engine.tick(0.1);
            assert!(out.calibrating);
            assert!(out.scores.is_none());
        }

        engine.submit_sample(&face(0.1, 0.1)).unwrap();
        engine.tick(0.1);
        engine.submit_sample(&face(0.1, 0.1)).unwrap();
        let out = engine.tick(0.1);
        assert!(!out.calibrating);
        assert!(out.scores.is_some());
    }

    #[test]
    fn test_missing_sample_holds_scores() {
        let mut engine = EmotionEngine::new(EngineConfig {
            ema_alpha: 1.0,
            auto_calibrate_on_start: false,
            ..EngineConfig::default()
        });
        engine.submit_sample(&face(1.0, 1.0)).unwrap();
        let first = engine.tick(0.1);
        let second = engine.tick(0.1);
        assert_eq!(first.scores, second.scores);
        assert!(second.action_units.is_none());
        assert!((engine.hold_times().happy - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut engine = EmotionEngine::new(EngineConfig::default());
        let out = engine.tick(f32::NAN);
        assert_eq!(out.time, 0.0);
        let out = engine.tick(-1.0);
        assert_eq!(out.time, 0.0);
        assert_eq!(out.dt, 0.0);
        assert!(out.calibrating);
    }

    #[test]
    fn test_clock_keeps_precision_over_long_sessions() {
        let mut engine = EmotionEngine::new(EngineConfig::default());
        let dt = 1.0 / 90.0;
        let ticks = 90 * 3600;
        let mut out = engine.tick(dt);
        for _ in 1..ticks {
            out = engine.tick(dt);
        }
        let expected = f64::from(dt) * ticks as f64;
        assert!((out.time - expected).abs() < 1e-3, "clock at {}", out.time);
    }

    #[test]
    fn test_smoothing_resumes_from_previous_scores_after_recalibration() {
        let alpha = 0.5;
        let mut engine = EmotionEngine::new(EngineConfig {
            ema_alpha: alpha,
            auto_calibrate_on_start: false,
            calibration_window_secs: 0.2,
            ..EngineConfig::default()
        });

        let smile = face(1.0, 1.0);
        for _ in 0..20 {
            engine.submit_sample(&smile).unwrap();
            engine.tick(0.1);
        }
        let before = engine.tick(0.0).scores.unwrap();
        assert!(before.happy > 0.99);

        // Calibrate on the smiling face so every later delta is zero.
        engine.request_recalibration();
        engine.submit_sample(&smile).unwrap();
        let out = engine.tick(0.1);
        assert!(out.calibrating);
        assert!(out.scores.is_none());

        engine.submit_sample(&smile).unwrap();
        let ready = engine.tick(0.1);
        assert!(!ready.calibrating);

        // One EMA step from the held scores towards zero, not a restart at zero.
        let after = ready.scores.unwrap();
        assert!((after.happy - before.happy * (1.0 - alpha)).abs() < 1e-5);
        assert!(after.happy > 0.4);

        engine.submit_sample(&smile).unwrap();
        let next = engine.tick(0.1).scores.unwrap();
        assert!((next.happy - after.happy * (1.0 - alpha)).abs() < 1e-5);
    }
}
