//! Data models for strokes and sessions
//!
//! Field names on the wire follow the device's own naming (`time`, `spm`,
//! `calhr`, ...) so subscribers see the same keys the monitor reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate monitor metrics reported by the erg on every poll.
///
/// Values arrive pre-computed from the device; nothing here is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorReading {
    /// Elapsed workout time in seconds
    #[serde(rename = "time")]
    pub elapsed_time: f64,

    /// Distance in meters
    pub distance: f64,

    #[serde(rename = "spm")]
    pub strokes_per_minute: u32,

    /// Watts
    pub power: u32,

    /// Seconds per 500m
    pub pace: f64,

    #[serde(rename = "calhr")]
    pub calories_per_hour: f64,

    pub calories: u32,

    #[serde(rename = "heartrate")]
    pub heart_rate: u32,

    #[serde(rename = "status")]
    pub machine_status: u32,
}

/// Raw workout descriptor as returned by the device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutInfo {
    /// 0 = not started, 1 = in progress, anything else = finished
    pub state: i64,

    #[serde(rename = "userid")]
    pub user_id: String,

    #[serde(rename = "type")]
    pub workout_type: u32,

    #[serde(rename = "inttype")]
    pub interval_type: u32,

    #[serde(rename = "intcount")]
    pub interval_count: u32,

    pub status: u32,
}

/// One stroke, from the first polled drive sample to the end of the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub stroke_id: u32,
    pub monitor_at_start: MonitorReading,
    pub monitor_at_end: MonitorReading,
    /// Complete drive curve in receipt order
    pub force_curve: Vec<f64>,
}

impl StrokeRecord {
    /// Open a new stroke at the first drive snapshot
    pub fn open(stroke_id: u32, monitor_at_start: MonitorReading, initial: &[f64]) -> Self {
        Self {
            stroke_id,
            monitor_at_start,
            monitor_at_end: monitor_at_start,
            force_curve: initial.to_vec(),
        }
    }

    /// Append samples polled while the drive persists
    pub fn extend(&mut self, samples: &[f64]) {
        self.force_curve.extend_from_slice(samples);
    }

    /// Finalize the stroke with the reading taken when the drive ended
    pub fn close(mut self, monitor_at_end: MonitorReading) -> Self {
        self.monitor_at_end = monitor_at_end;
        self
    }
}

/// One workout on one erg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub erg_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stroke_count: u32,
}

impl SessionRecord {
    pub fn open(erg_id: impl Into<String>) -> Self {
        Self {
            erg_id: erg_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            stroke_count: 0,
        }
    }

    /// Close the session at the current wall-clock time
    pub fn close(mut self, stroke_count: u32) -> Self {
        self.ended_at = Some(Utc::now());
        self.stroke_count = stroke_count;
        self
    }

    /// Session length in seconds (up to now while still active)
    pub fn duration_s(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
