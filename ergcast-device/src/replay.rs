//! Replay a recorded workout log as if an erg were attached
//!
//! Each logged stroke becomes a short run of frames: recovery, the drive split
//! into per-poll chunks, then a dwelling frame that closes the drive. The
//! session is bracketed by idle frames before and finished frames after; then
//! the replayed erg disconnects.

use std::path::Path;

use ergcast_records::{import_workout_file, LoggedStroke, MonitorReading};

use crate::device::{DeviceHandle, DeviceProvider, ErgDevice};
use crate::error::Result;
use crate::scripted::{ScriptedErg, ScriptedFrame, ScriptedProvider};

const STATE_IDLE: i64 = 0;
const STATE_ACTIVE: i64 = 1;
const STATE_FINISHED: i64 = 2;

const STROKE_DRIVE: i64 = 2;
const STROKE_DWELLING: i64 = 3;
const STROKE_RECOVERY: i64 = 4;

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Force samples delivered per drive poll (default: 8)
    pub samples_per_poll: usize,
    /// Idle frames before the workout starts (default: 3)
    pub lead_in_polls: usize,
    /// Recovery frames before each drive (default: 2)
    pub recovery_polls: usize,
    /// Finished frames after the last stroke (default: 3)
    pub lead_out_polls: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            samples_per_poll: 8,
            lead_in_polls: 3,
            recovery_polls: 2,
            lead_out_polls: 3,
        }
    }
}

/// Build the frame script for a logged workout.
pub fn frames_from_log(strokes: &[LoggedStroke], options: &ReplayOptions) -> Vec<ScriptedFrame> {
    let chunk = options.samples_per_poll.max(1);
    let mut frames = Vec::new();

    for _ in 0..options.lead_in_polls {
        frames.push(ScriptedFrame::new(STATE_IDLE, 0, &[]));
    }

    let mut last_monitor = MonitorReading::default();
    for stroke in strokes {
        for _ in 0..options.recovery_polls {
            frames.push(
                ScriptedFrame::new(STATE_ACTIVE, STROKE_RECOVERY, &[]).with_monitor(stroke.monitor),
            );
        }

        if stroke.force_curve.is_empty() {
            frames.push(ScriptedFrame::new(STATE_ACTIVE, STROKE_DRIVE, &[]).with_monitor(stroke.monitor));
        }
        for samples in stroke.force_curve.chunks(chunk) {
            frames.push(
                ScriptedFrame::new(STATE_ACTIVE, STROKE_DRIVE, samples).with_monitor(stroke.monitor),
            );
        }

        frames.push(ScriptedFrame::new(STATE_ACTIVE, STROKE_DWELLING, &[]).with_monitor(stroke.monitor));
        last_monitor = stroke.monitor;
    }

    for _ in 0..options.lead_out_polls {
        frames.push(ScriptedFrame::new(STATE_FINISHED, 0, &[]).with_monitor(last_monitor));
    }

    frames
}

/// Device provider backed by one replayed workout log
pub struct ReplayProvider {
    inner: ScriptedProvider,
}

impl ReplayProvider {
    pub fn from_strokes(serial: impl Into<String>, strokes: &[LoggedStroke], options: &ReplayOptions) -> Self {
        let frames = frames_from_log(strokes, options);
        let erg = ScriptedErg::new("replay", serial, frames);
        Self {
            inner: ScriptedProvider::new(vec![erg]),
        }
    }

    /// Load a CSV workout log; the erg serial is derived from the file name.
    pub fn open_log(path: impl AsRef<Path>, options: &ReplayOptions) -> Result<Self> {
        let path = path.as_ref();
        let strokes = import_workout_file(path)?;
        let serial = path
            .file_stem()
            .map(|s| format!("replay-{}", s.to_string_lossy()))
            .unwrap_or_else(|| "replay".to_string());

        tracing::info!("Replaying {} strokes from {}", strokes.len(), path.display());
        Ok(Self::from_strokes(serial, &strokes, options))
    }
}

impl DeviceProvider for ReplayProvider {
    fn find(&self) -> Result<Vec<DeviceHandle>> {
        self.inner.find()
    }

    fn open(&self, handle: &DeviceHandle) -> Result<Box<dyn ErgDevice>> {
        self.inner.open(handle)
    }
}
