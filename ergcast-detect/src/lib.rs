//! Session and stroke detection for ErgCast
//!
//! Turns the polled [`Snapshot`](ergcast_device::Snapshot) stream into an
//! ordered stream of [`Event`]s. Two explicit state machines replace the
//! "spin until the state changes" loops a naive poller would use, so detection
//! is independent of polling cadence:
//!
//! - [`SessionStateMachine`] tracks the workout lifecycle
//!   (`Idle → Waiting → Active → Ended → Waiting`) from the device's session
//!   state and gates stroke aggregation.
//! - [`StrokeAggregator`] reconstructs strokes (start, incremental force
//!   samples, end with the complete curve) from the stroke-state signal.
//!
//! # Example
//!
//! ```
//! use ergcast_detect::{Event, SessionStateMachine};
//! use ergcast_device::{Sampler, SamplerConfig, ScriptedErg, ScriptedFrame};
//!
//! let erg = ScriptedErg::new("PM5", "430000001", vec![
//!     ScriptedFrame::new(1, 2, &[10.0, 20.0]),
//!     ScriptedFrame::new(1, 3, &[5.0]),
//!     ScriptedFrame::new(2, 0, &[]),
//! ]);
//! let mut sampler = Sampler::new(Box::new(erg), SamplerConfig::default());
//! let mut machine = SessionStateMachine::new("430000001");
//!
//! let mut events = Vec::new();
//! while let Ok(snapshot) = sampler.poll() {
//!     events.extend(machine.observe(&snapshot));
//! }
//!
//! match events.last() {
//!     Some(Event::SessionEnd { session, .. }) => assert_eq!(session.stroke_count, 1),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

mod event;
mod session;
mod stroke;

pub use event::{Event, EventKind};
pub use session::{SessionPhase, SessionStateMachine};
pub use stroke::StrokeAggregator;
