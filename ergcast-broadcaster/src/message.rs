use chrono::{DateTime, Utc};
use ergcast_detect::Event;
use ergcast_records::{MonitorReading, WorkoutInfo};
use serde::{Deserialize, Serialize};

/// Text sent when the machine parks before a workout
pub const WAITING_TEXT: &str = "Waiting for workout to begin...";

/// Wire envelope: `{"type": ..., "content": ...}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "content")]
pub enum WireMessage {
    /// Human-readable notice
    #[serde(rename = "TXT")]
    Text(String),

    #[serde(rename = "WORKOUT_START")]
    WorkoutStart {
        erg_id: String,
        monitor: MonitorReading,
        workout: WorkoutInfo,
        started_at: DateTime<Utc>,
    },

    #[serde(rename = "STROKE_START")]
    StrokeStart {
        erg_id: String,
        stroke_id: u32,
        monitor: MonitorReading,
    },

    /// Samples from one poll only
    #[serde(rename = "STROKE_FORCE")]
    StrokeForce {
        erg_id: String,
        stroke_id: u32,
        forceplot: Vec<f64>,
        time: f64,
    },

    /// Full curve; monitor is taken at the end of the stroke
    #[serde(rename = "STROKE_END")]
    StrokeEnd {
        erg_id: String,
        stroke_id: u32,
        monitor: MonitorReading,
        forceplot: Vec<f64>,
    },

    #[serde(rename = "WORKOUT_END")]
    WorkoutEnd {
        erg_id: String,
        monitor: MonitorReading,
        workout: WorkoutInfo,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        stroke_count: u32,
    },
}

impl WireMessage {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text(text.into())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&Event> for WireMessage {
    fn from(event: &Event) -> Self {
        match event {
            Event::Notice { message } => WireMessage::Text(message.clone()),
            Event::SessionWaiting { .. } => WireMessage::text(WAITING_TEXT),
            Event::SessionStart {
                session,
                monitor,
                workout,
            } => WireMessage::WorkoutStart {
                erg_id: session.erg_id.clone(),
                monitor: *monitor,
                workout: workout.clone(),
                started_at: session.started_at,
            },
            Event::StrokeStart {
                erg_id,
                stroke_id,
                monitor,
            } => WireMessage::StrokeStart {
                erg_id: erg_id.clone(),
                stroke_id: *stroke_id,
                monitor: *monitor,
            },
            Event::StrokeForce {
                erg_id,
                stroke_id,
                samples,
                time,
            } => WireMessage::StrokeForce {
                erg_id: erg_id.clone(),
                stroke_id: *stroke_id,
                forceplot: samples.clone(),
                time: *time,
            },
            Event::StrokeEnd { erg_id, stroke } => WireMessage::StrokeEnd {
                erg_id: erg_id.clone(),
                stroke_id: stroke.stroke_id,
                monitor: stroke.monitor_at_end,
                forceplot: stroke.force_curve.clone(),
            },
            Event::SessionEnd {
                session,
                monitor,
                workout,
            } => WireMessage::WorkoutEnd {
                erg_id: session.erg_id.clone(),
                monitor: *monitor,
                workout: workout.clone(),
                started_at: session.started_at,
                ended_at: session.ended_at,
                stroke_count: session.stroke_count,
            },
        }
    }
}
