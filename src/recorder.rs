//! CSV session recorder.
//!
//! Writes one header row and then one row per recorded tick:
//! `time,au6,au12,au4,au15,au26,happy,angry,sad,surprise`. Time is written
//! with 3 decimals, every other field with 4.
//!
//! `time` is relative to `start` and returns to 0 on `stop`. Ticks without a
//! fresh sample repeat the last action units seen, and ticks without scores
//! (calibration) repeat the last scores seen. Both start at zero.

use std::io::{self, Write};

use tracing::debug;

use crate::core::EngineOutput;
use crate::facs::{features::ActionUnits, EmotionScores};

pub const CSV_HEADER: &str = "time,au6,au12,au4,au15,au26,happy,angry,sad,surprise";

#[derive(Debug)]
pub struct CsvRecorder<W: Write> {
    writer: W,
    recording: bool,
    header_written: bool,
    rows: usize,
    clock: f64,
    last_aus: ActionUnits,
    last_scores: EmotionScores,
}

impl<W: Write> CsvRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            recording: false,
            header_written: false,
            rows: 0,
            clock: 0.0,
            last_aus: ActionUnits::default(),
            last_scores: EmotionScores::default(),
        }
    }

    pub fn start(&mut self) {
        if !self.recording {
            debug!("recording started");
            self.clock = 0.0;
        }
        self.recording = true;
    }

    pub fn stop(&mut self) {
        if self.recording {
            debug!("recording stopped at t={:.3}s", self.clock);
        }
        self.recording = false;
        self.clock = 0.0;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Seconds recorded since `start`.
    pub fn elapsed(&self) -> f64 {
        self.clock
    }

    /// Offer one tick to the recorder. Held values are refreshed on every
    /// call; a row is written only while recording. Returns whether a row
    /// was written.
    pub fn record(&mut self, output: &EngineOutput) -> io::Result<bool> {
        if let Some(aus) = output.action_units {
            self.last_aus = aus;
        }
        if let Some(scores) = output.scores {
            self.last_scores = scores;
        }

        if !self.recording {
            return Ok(false);
        }
        self.clock += f64::from(output.dt);

        if !self.header_written {
            writeln!(self.writer, "{}", CSV_HEADER)?;
            self.header_written = true;
        }

        let aus = &self.last_aus;
        let scores = &self.last_scores;
        writeln!(
            self.writer,
            "{:.3},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}",
            self.clock,
            aus.au6,
            aus.au12,
            aus.au4,
            aus.au15,
            aus.au26,
            scores.happy,
            scores.angry,
            scores.sad,
            scores.surprise,
        )?;
        self.rows += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        debug!("recorder closed after {} rows", self.rows);
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::EmotionEngine;
    use crate::facs::channels::RawSample;
    use crate::facs::EmotionFlags;

    fn output(dt: f32, calibrating: bool, with_sample: bool) -> EngineOutput {
        EngineOutput {
            time: 0.0,
            dt,
            calibrating,
            scores: (!calibrating).then(|| EmotionScores {
                happy: 0.61234,
                angry: 0.0,
                sad: 0.1,
                surprise: 1.0,
            }),
            confirmed: EmotionFlags::default(),
            stable: EmotionFlags::default(),
            action_units: with_sample.then(|| ActionUnits {
                au6: 0.5,
                au12: 0.25,
                au4: 0.0,
                au15: 0.125,
                au26: 1.0,
            }),
        }
    }

    fn lines(rec: CsvRecorder<Vec<u8>>) -> Vec<String> {
        let text = String::from_utf8(rec.into_inner().unwrap()).unwrap();
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_rows_only_while_recording() {
        let mut rec = CsvRecorder::new(Vec::new());
        assert!(!rec.record(&output(0.1, false, true)).unwrap());

        rec.start();
        assert!(rec.record(&output(0.5, false, true)).unwrap());
        assert!(rec.record(&output(1.0, false, false)).unwrap());
        rec.stop();
        assert!(!rec.record(&output(0.1, false, true)).unwrap());
        assert_eq!(rec.elapsed(), 0.0);

        assert_eq!(rec.rows(), 2);
        let lines = lines(rec);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "0.500,0.5000,0.2500,0.0000,0.1250,1.0000,0.6123,0.0000,0.1000,1.0000"
        );
        // No fresh sample: action units are repeated.
        assert_eq!(
            lines[2],
            "1.500,0.5000,0.2500,0.0000,0.1250,1.0000,0.6123,0.0000,0.1000,1.0000"
        );
    }

    #[test]
    fn test_header_written_once() {
        let mut rec = CsvRecorder::new(Vec::new());
        rec.start();
        for _ in 0..3 {
            rec.record(&output(0.1, false, true)).unwrap();
        }
        rec.stop();
        rec.start();
        rec.record(&output(0.1, false, true)).unwrap();

        let lines = lines(rec);
        assert_eq!(lines.iter().filter(|l| l.starts_with("time,")).count(), 1);
        assert_eq!(lines.len(), 5);
        // Time restarts after stop.
        assert!(lines[4].starts_with("0.100,"));
    }

    #[test]
    fn test_every_tick_recorded_from_engine_start() {
        let mut engine = EmotionEngine::new(EngineConfig::default());
        let mut rec = CsvRecorder::new(Vec::new());
        rec.start();

        let sample = RawSample::uniform(0.2);
        for i in 0..15 {
            if i % 3 != 2 {
                engine.submit_sample(&sample).unwrap();
            }
            rec.record(&engine.tick(0.1)).unwrap();
        }
        assert_eq!(rec.rows(), 15);

        let lines = lines(rec);
        assert_eq!(lines.len(), 16);
        // Calibrating rows carry the zero scores held before the first result.
        assert_eq!(
            lines[1],
            "0.100,0.2000,0.2000,0.2000,0.2000,0.2000,0.0000,0.0000,0.0000,0.0000"
        );
        assert!(lines[15].starts_with("1.500,"));
    }
}
