use ergcast_records::{MonitorReading, SessionRecord, StrokeRecord, WorkoutInfo};

/// Events produced by the detection state machines, in production order.
///
/// Every variant carries the erg id (and stroke id where it applies) so a
/// subscriber that missed earlier events can still interpret it.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Human-readable diagnostic, outside the state-machine contract
    Notice { message: String },

    /// Parked before a workout, announced once per wait
    SessionWaiting { erg_id: String },

    SessionStart {
        session: SessionRecord,
        monitor: MonitorReading,
        workout: WorkoutInfo,
    },

    StrokeStart {
        erg_id: String,
        stroke_id: u32,
        monitor: MonitorReading,
    },

    /// Samples from a single poll, never the cumulative curve
    StrokeForce {
        erg_id: String,
        stroke_id: u32,
        samples: Vec<f64>,
        /// Monitor elapsed time at the poll
        time: f64,
    },

    /// Finalized stroke with the complete curve
    StrokeEnd { erg_id: String, stroke: StrokeRecord },

    SessionEnd {
        session: SessionRecord,
        monitor: MonitorReading,
        workout: WorkoutInfo,
    },
}

/// Discriminant of [`Event`], for logging and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Notice,
    SessionWaiting,
    SessionStart,
    StrokeStart,
    StrokeForce,
    StrokeEnd,
    SessionEnd,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Notice => write!(f, "notice"),
            EventKind::SessionWaiting => write!(f, "session_waiting"),
            EventKind::SessionStart => write!(f, "session_start"),
            EventKind::StrokeStart => write!(f, "stroke_start"),
            EventKind::StrokeForce => write!(f, "stroke_force"),
            EventKind::StrokeEnd => write!(f, "stroke_end"),
            EventKind::SessionEnd => write!(f, "session_end"),
        }
    }
}

impl Event {
    pub fn notice<S: Into<String>>(message: S) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Notice { .. } => EventKind::Notice,
            Event::SessionWaiting { .. } => EventKind::SessionWaiting,
            Event::SessionStart { .. } => EventKind::SessionStart,
            Event::StrokeStart { .. } => EventKind::StrokeStart,
            Event::StrokeForce { .. } => EventKind::StrokeForce,
            Event::StrokeEnd { .. } => EventKind::StrokeEnd,
            Event::SessionEnd { .. } => EventKind::SessionEnd,
        }
    }

    pub fn erg_id(&self) -> Option<&str> {
        match self {
            Event::Notice { .. } => None,
            Event::SessionWaiting { erg_id }
            | Event::StrokeStart { erg_id, .. }
            | Event::StrokeForce { erg_id, .. }
            | Event::StrokeEnd { erg_id, .. } => Some(erg_id.as_str()),
            Event::SessionStart { session, .. } | Event::SessionEnd { session, .. } => {
                Some(session.erg_id.as_str())
            }
        }
    }

    pub fn stroke_id(&self) -> Option<u32> {
        match self {
            Event::StrokeStart { stroke_id, .. } | Event::StrokeForce { stroke_id, .. } => {
                Some(*stroke_id)
            }
            Event::StrokeEnd { stroke, .. } => Some(stroke.stroke_id),
            _ => None,
        }
    }
}
