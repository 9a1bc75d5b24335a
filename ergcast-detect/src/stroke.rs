//! Stroke reconstruction from the stroke-state signal
//!
//! Sample convention: the samples of the snapshot that opens a drive, of every
//! drive snapshot, and of the first non-drive snapshot are each appended to the
//! curve once and emitted once as a `StrokeForce`. The sum of a stroke's
//! `StrokeForce` partials is therefore exactly its `StrokeEnd` curve.

use ergcast_device::{Snapshot, StrokeState};
use ergcast_records::{MonitorReading, StrokeRecord};
use tracing::{debug, warn};

use crate::event::Event;

enum Phase {
    WaitingForDrive,
    InDrive(StrokeRecord),
}

/// Stroke sub-state machine. Driven only while a session is active.
pub struct StrokeAggregator {
    erg_id: String,
    phase: Phase,
    next_id: u32,
    completed: u32,
    last_state: Option<StrokeState>,
    /// The previous snapshot closed a stroke
    just_closed: bool,
}

impl StrokeAggregator {
    pub fn new(erg_id: impl Into<String>) -> Self {
        Self {
            erg_id: erg_id.into(),
            phase: Phase::WaitingForDrive,
            next_id: 0,
            completed: 0,
            last_state: None,
            just_closed: false,
        }
    }

    /// Start counting from stroke 0 for a new session.
    pub fn reset(&mut self) {
        self.phase = Phase::WaitingForDrive;
        self.next_id = 0;
        self.completed = 0;
        self.last_state = None;
        self.just_closed = false;
    }

    /// Feed one snapshot taken while the session is active.
    pub fn observe(&mut self, snapshot: &Snapshot, out: &mut Vec<Event>) {
        let time = snapshot.monitor.elapsed_time;
        let completed_before = self.completed;

        self.phase = match std::mem::replace(&mut self.phase, Phase::WaitingForDrive) {
            Phase::WaitingForDrive if snapshot.is_drive() => {
                let stroke = self.open_stroke(snapshot.monitor, out);
                Phase::InDrive(self.append(stroke, &snapshot.force_sample, time, out))
            }
            Phase::WaitingForDrive => {
                if self.missed_drive(snapshot.stroke_state) {
                    // Drive began and ended between two polls. Upstream
                    // anomaly: keep the stroke rather than lose it.
                    warn!(
                        "Stroke end without an open stroke (erg {}), synthesizing stroke {}",
                        self.erg_id, self.next_id
                    );
                    let stroke = self.open_stroke(snapshot.monitor, out);
                    let stroke = self.append(stroke, &snapshot.force_sample, time, out);
                    self.finish(stroke, snapshot.monitor, out);
                }
                Phase::WaitingForDrive
            }
            Phase::InDrive(stroke) if snapshot.is_drive() => {
                Phase::InDrive(self.append(stroke, &snapshot.force_sample, time, out))
            }
            Phase::InDrive(stroke) => {
                let stroke = self.append(stroke, &snapshot.force_sample, time, out);
                self.finish(stroke, snapshot.monitor, out);
                Phase::WaitingForDrive
            }
        };

        self.last_state = Some(snapshot.stroke_state);
        self.just_closed = self.completed != completed_before;
    }

    /// Close a stroke left open when the session ends. Returns whether one was
    /// open.
    pub fn force_close(&mut self, monitor: MonitorReading, out: &mut Vec<Event>) -> bool {
        match std::mem::replace(&mut self.phase, Phase::WaitingForDrive) {
            Phase::InDrive(stroke) => {
                debug!("Force-closing stroke {} at session end", stroke.stroke_id);
                self.finish(stroke, monitor, out);
                true
            }
            Phase::WaitingForDrive => false,
        }
    }

    pub fn in_drive(&self) -> bool {
        matches!(self.phase, Phase::InDrive(_))
    }

    /// StrokeEnd events emitted since the last reset
    pub fn strokes_completed(&self) -> u32 {
        self.completed
    }

    /// A dwelling report straight after a recovery-side state means the whole
    /// drive fell between polls.
    fn missed_drive(&self, current: StrokeState) -> bool {
        current == StrokeState::Dwelling
            && !self.just_closed
            && matches!(
                self.last_state,
                Some(StrokeState::Recovery | StrokeState::Catch | StrokeState::Finish)
            )
    }

    fn open_stroke(&mut self, monitor: MonitorReading, out: &mut Vec<Event>) -> StrokeRecord {
        let stroke_id = self.next_id;
        self.next_id += 1;

        out.push(Event::StrokeStart {
            erg_id: self.erg_id.clone(),
            stroke_id,
            monitor,
        });
        StrokeRecord::open(stroke_id, monitor, &[])
    }

    fn append(
        &self,
        mut stroke: StrokeRecord,
        samples: &[f64],
        time: f64,
        out: &mut Vec<Event>,
    ) -> StrokeRecord {
        if !samples.is_empty() {
            stroke.extend(samples);
            out.push(Event::StrokeForce {
                erg_id: self.erg_id.clone(),
                stroke_id: stroke.stroke_id,
                samples: samples.to_vec(),
                time,
            });
        }
        stroke
    }

    fn finish(&mut self, stroke: StrokeRecord, monitor: MonitorReading, out: &mut Vec<Event>) {
        let stroke = stroke.close(monitor);
        self.completed += 1;

        debug!(
            "[{}] time: {}, distance: {}, pace: {}, samples: {}",
            stroke.stroke_id,
            monitor.elapsed_time,
            monitor.distance,
            monitor.pace,
            stroke.force_curve.len()
        );

        out.push(Event::StrokeEnd {
            erg_id: self.erg_id.clone(),
            stroke,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergcast_device::SessionState;
    use ergcast_records::WorkoutInfo;

    fn snap(stroke_state: StrokeState, force: &[f64], t: f64) -> Snapshot {
        Snapshot {
            session_state: SessionState::Active,
            stroke_state,
            monitor: MonitorReading {
                elapsed_time: t,
                ..Default::default()
            },
            workout: WorkoutInfo {
                state: 1,
                ..Default::default()
            },
            force_sample: force.to_vec(),
        }
    }

    fn run(aggregator: &mut StrokeAggregator, snaps: &[Snapshot]) -> Vec<Event> {
        let mut out = Vec::new();
        for s in snaps {
            aggregator.observe(s, &mut out);
        }
        out
    }

    fn end_curves(events: &[Event]) -> Vec<Vec<f64>> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::StrokeEnd { stroke, .. } => Some(stroke.force_curve.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_stroke_curve_includes_both_boundaries() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Recovery, &[], 0.0),
                snap(StrokeState::Drive, &[1.0, 2.0], 0.1),
                snap(StrokeState::Drive, &[3.0, 4.0], 0.2),
                snap(StrokeState::Dwelling, &[5.0], 0.3),
            ],
        );

        assert_eq!(end_curves(&events), vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        assert!(matches!(events[0], Event::StrokeStart { stroke_id: 0, .. }));
        assert_eq!(agg.strokes_completed(), 1);
        assert!(!agg.in_drive());
    }

    #[test]
    fn test_partials_sum_to_end_curve() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Drive, &[1.0], 0.1),
                snap(StrokeState::Drive, &[], 0.2),
                snap(StrokeState::Drive, &[2.0, 3.0], 0.3),
                snap(StrokeState::Recovery, &[4.0], 0.4),
            ],
        );

        let partials: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                Event::StrokeForce { samples, .. } => Some(samples.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(partials, end_curves(&events)[0]);
    }

    #[test]
    fn test_force_time_comes_from_monitor() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(&mut agg, &[snap(StrokeState::Drive, &[9.0], 4.25)]);
        match &events[1] {
            Event::StrokeForce { time, samples, .. } => {
                assert_eq!(*time, 4.25);
                assert_eq!(samples, &vec![9.0]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_samples_emit_no_force_event() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Drive, &[], 0.1),
                snap(StrokeState::Dwelling, &[], 0.2),
            ],
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::StrokeStart { .. }));
        assert!(matches!(events[1], Event::StrokeEnd { .. }));
    }

    #[test]
    fn test_ids_increase_and_reset() {
        let mut agg = StrokeAggregator::new("1");
        let stroke = [
            snap(StrokeState::Drive, &[1.0], 0.0),
            snap(StrokeState::Recovery, &[], 0.0),
        ];
        let mut events = run(&mut agg, &stroke);
        events.extend(run(&mut agg, &stroke));
        events.extend(run(&mut agg, &stroke));

        let ids: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e, Event::StrokeStart { .. }))
            .filter_map(Event::stroke_id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);

        agg.reset();
        let events = run(&mut agg, &stroke);
        assert_eq!(events[0].stroke_id(), Some(0));
        assert_eq!(agg.strokes_completed(), 1);
    }

    #[test]
    fn test_force_close_open_stroke() {
        let mut agg = StrokeAggregator::new("1");
        let mut events = run(
            &mut agg,
            &[
                snap(StrokeState::Drive, &[1.0], 0.1),
                snap(StrokeState::Drive, &[2.0], 0.2),
            ],
        );
        assert!(agg.in_drive());

        let end_monitor = MonitorReading {
            elapsed_time: 9.0,
            ..Default::default()
        };
        assert!(agg.force_close(end_monitor, &mut events));
        assert!(!agg.force_close(end_monitor, &mut events));

        match events.last().unwrap() {
            Event::StrokeEnd { stroke, .. } => {
                assert_eq!(stroke.force_curve, vec![1.0, 2.0]);
                assert_eq!(stroke.monitor_at_end.elapsed_time, 9.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missed_drive_synthesizes_stroke() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Recovery, &[], 0.1),
                snap(StrokeState::Dwelling, &[7.0], 0.2),
                snap(StrokeState::Dwelling, &[], 0.3),
            ],
        );

        assert_eq!(end_curves(&events), vec![vec![7.0]]);
        match events.last().unwrap() {
            Event::StrokeEnd { stroke, .. } => {
                assert_eq!(stroke.monitor_at_start, stroke.monitor_at_end);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dwelling_after_closing_recovery_is_not_a_stroke() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Drive, &[1.0], 0.1),
                snap(StrokeState::Recovery, &[], 0.2),
                snap(StrokeState::Dwelling, &[], 0.3),
            ],
        );
        assert_eq!(end_curves(&events).len(), 1);
    }

    #[test]
    fn test_dwelling_at_session_start_is_not_a_stroke() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(&mut agg, &[snap(StrokeState::Dwelling, &[3.0], 0.0)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_single_poll_drive_is_kept() {
        let mut agg = StrokeAggregator::new("1");
        let events = run(
            &mut agg,
            &[
                snap(StrokeState::Drive, &[6.0], 0.1),
                snap(StrokeState::Recovery, &[], 0.2),
            ],
        );
        let curves = end_curves(&events);
        assert_eq!(curves, vec![vec![6.0]]);
    }
}
