//! Offline replay of recorded raw channel weights.
//!
//! Input is a CSV file whose header names raw channels (`cheek_raiser_l`,
//! `jaw_drop`, ...). Columns that are not raw channels must be listed in
//! `IGNORED_COLUMNS`; anything else is rejected so typos do not silently
//! turn into missing channels.

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{EmotionEngine, EngineOutput};
use crate::error::EngineError;
use crate::facs::channels::{RawChannel, RawSample};
use crate::facs::{Emotion, PerEmotion};
use crate::recorder::CsvRecorder;

/// Bookkeeping columns that may appear next to the channels.
pub const IGNORED_COLUMNS: &[&str] = &["time", "user_id", "frame"];

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: bad value `{value}` in column `{column}`")]
    BadValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("data row {row}: {source}")]
    Engine { row: usize, source: EngineError },
}

/// What happened over a whole replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub ticks: usize,
    pub calibrated_at: Option<f64>,
    /// Engine time at which each emotion was first confirmed.
    pub first_confirmed: PerEmotion<Option<f64>>,
    pub rows_recorded: usize,
}

/// Parse every data row into a `RawSample`.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<RawSample>, ReplayError> {
    let mut lines = reader.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(ReplayError::MissingHeader),
        }
    };

    let mut columns: Vec<Option<RawChannel>> = Vec::new();
    for name in header.split(',') {
        let name = name.trim();
        match RawChannel::from_name(name) {
            Some(channel) => columns.push(Some(channel)),
            None if IGNORED_COLUMNS.contains(&name.to_ascii_lowercase().as_str()) => {
                columns.push(None)
            }
            None => return Err(ReplayError::UnknownColumn(name.to_string())),
        }
    }
    debug!("replay header has {} columns", columns.len());

    let mut samples = Vec::new();
    for (idx, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != columns.len() {
            return Err(ReplayError::ColumnCount {
                line: line_no,
                expected: columns.len(),
                found: fields.len(),
            });
        }

        let mut sample = RawSample::new();
        for (column, field) in columns.iter().zip(fields) {
            let Some(channel) = column else { continue };
            let value: f32 = field.trim().parse().map_err(|_| ReplayError::BadValue {
                line: line_no,
                column: channel.as_str().to_string(),
                value: field.to_string(),
            })?;
            sample.set(*channel, value);
        }
        samples.push(sample);
    }

    Ok(samples)
}

/// Feed one sample per tick of `dt` seconds. Every tick is offered to the
/// recorder when one is given.
pub fn run<W: Write>(
    engine: &mut EmotionEngine,
    samples: &[RawSample],
    dt: f32,
    mut recorder: Option<&mut CsvRecorder<W>>,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();
    let mut was_calibrating = engine.is_calibrating();

    for (i, sample) in samples.iter().enumerate() {
        engine
            .submit_sample(sample)
            .map_err(|source| ReplayError::Engine { row: i + 1, source })?;
        let out = engine.tick(dt);
        summary.ticks += 1;

        if was_calibrating && !out.calibrating && summary.calibrated_at.is_none() {
            summary.calibrated_at = Some(out.time);
        }
        was_calibrating = out.calibrating;

        note_confirmations(&mut summary, &out);

        if let Some(rec) = recorder.as_deref_mut() {
            if rec.record(&out)? {
                summary.rows_recorded += 1;
            }
        }
    }

    if engine.is_calibrating() {
        warn!("replay ended while still calibrating");
    }
    info!(
        "replayed {} ticks, {} rows recorded",
        summary.ticks, summary.rows_recorded
    );
    Ok(summary)
}

fn note_confirmations(summary: &mut ReplaySummary, out: &EngineOutput) {
    for emotion in Emotion::ALL {
        let slot = summary.first_confirmed.get_mut(emotion);
        if slot.is_none() && out.confirmed.get(emotion) {
            info!("{} confirmed at t={:.3}s", emotion.as_str(), out.time);
            *slot = Some(out.time);
        }
    }
}
