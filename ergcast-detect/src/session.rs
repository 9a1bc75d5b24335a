//! Workout lifecycle tracking

use ergcast_device::Snapshot;
use ergcast_records::{MonitorReading, SessionRecord, WorkoutInfo};
use tracing::{debug, info};

use crate::event::Event;
use crate::stroke::StrokeAggregator;

/// Lifecycle phase of the session machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing observed yet
    Idle,
    /// Parked before a workout
    Waiting,
    Active,
    /// Transient: resolves to `Waiting` within the same observation
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Waiting => write!(f, "waiting"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Ended => write!(f, "ended"),
        }
    }
}

/// Level-triggered session machine. Owns the stroke aggregator and only feeds
/// it while a session is open.
pub struct SessionStateMachine {
    erg_id: String,
    phase: SessionPhase,
    announced: bool,
    session: Option<SessionRecord>,
    strokes: StrokeAggregator,
    last_monitor: MonitorReading,
    last_workout: WorkoutInfo,
    sessions_completed: u32,
}

impl SessionStateMachine {
    pub fn new(erg_id: impl Into<String>) -> Self {
        let erg_id = erg_id.into();
        Self {
            strokes: StrokeAggregator::new(erg_id.clone()),
            erg_id,
            phase: SessionPhase::Idle,
            announced: false,
            session: None,
            last_monitor: MonitorReading::default(),
            last_workout: WorkoutInfo::default(),
            sessions_completed: 0,
        }
    }

    /// Advance on one snapshot and return the events it produced, in order.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Vec<Event> {
        let mut events = Vec::new();

        match (self.phase, snapshot.is_active()) {
            (SessionPhase::Active, true) => {
                self.strokes.observe(snapshot, &mut events);
            }
            (SessionPhase::Active, false) => {
                self.end_session(snapshot.monitor, snapshot.workout.clone(), &mut events);
            }
            (_, true) => {
                self.start_session(snapshot, &mut events);
                self.strokes.observe(snapshot, &mut events);
            }
            (_, false) => {
                if !self.announced {
                    events.push(Event::SessionWaiting {
                        erg_id: self.erg_id.clone(),
                    });
                    self.announced = true;
                }
                self.phase = SessionPhase::Waiting;
            }
        }

        self.last_monitor = snapshot.monitor;
        self.last_workout = snapshot.workout.clone();
        events
    }

    /// Close whatever is open after the device went away. Uses the last good
    /// readings for the terminal events.
    pub fn abort(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.phase == SessionPhase::Active {
            info!("Closing session on erg {} after device loss", self.erg_id);
            let monitor = self.last_monitor;
            let workout = self.last_workout.clone();
            self.end_session(monitor, workout, &mut events);
        }
        events
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn erg_id(&self) -> &str {
        &self.erg_id
    }

    /// The open session, if any
    pub fn current_session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    fn start_session(&mut self, snapshot: &Snapshot, out: &mut Vec<Event>) {
        let session = SessionRecord::open(self.erg_id.clone());
        info!("Workout started on erg {} at {}", self.erg_id, session.started_at);

        self.strokes.reset();
        self.phase = SessionPhase::Active;
        self.session = Some(session.clone());

        out.push(Event::SessionStart {
            session,
            monitor: snapshot.monitor,
            workout: snapshot.workout.clone(),
        });
    }

    fn end_session(&mut self, monitor: MonitorReading, workout: WorkoutInfo, out: &mut Vec<Event>) {
        self.strokes.force_close(monitor, out);

        let count = self.strokes.strokes_completed();
        let session = self
            .session
            .take()
            .unwrap_or_else(|| SessionRecord::open(self.erg_id.clone()))
            .close(count);

        info!(
            "Workout ended on erg {}: {} strokes in {:.1}s",
            self.erg_id,
            count,
            session.duration_s()
        );

        out.push(Event::SessionEnd {
            session,
            monitor,
            workout,
        });

        self.sessions_completed += 1;
        self.phase = SessionPhase::Ended;
        debug!("Session phase {} -> {}", self.phase, SessionPhase::Waiting);
        self.phase = SessionPhase::Waiting;
        self.announced = false;
    }
}
