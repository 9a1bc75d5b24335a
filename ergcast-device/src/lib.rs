//! ErgCast device layer
//!
//! Everything between the physical erg and the detection state machines.
//! The USB driver itself is an external collaborator reached through the
//! [`DeviceProvider`] / [`ErgDevice`] traits; this crate composes its three raw
//! reads into [`Snapshot`]s at a fixed cadence.
//!
//! ## Architecture
//!
//! ```text
//! DeviceProvider::find() ──> DeviceHandle
//!   │
//!   └─> DeviceProvider::open() ──> Box<dyn ErgDevice>
//!         │
//!         └─> Sampler::poll()
//!               ├─> get_workout()    (session state)
//!               ├─> get_monitor()    (aggregate metrics)
//!               └─> get_force_plot() (stroke state + force samples)
//!                     │
//!                     └─> Snapshot
//! ```
//!
//! [`ScriptedErg`] and [`ReplayProvider`] stand in for hardware in tests and
//! when replaying a recorded workout log.

pub mod device;
pub mod error;
pub mod replay;
pub mod sampler;
pub mod scripted;
pub mod snapshot;

pub use device::{DeviceHandle, DeviceProvider, ErgDevice, ErgInfo, ForcePlot};
pub use error::{DeviceError, Result};
pub use replay::{frames_from_log, ReplayOptions, ReplayProvider};
pub use sampler::{Sampler, SamplerConfig};
pub use scripted::{ScriptedErg, ScriptedFrame, ScriptedProvider};
pub use snapshot::{SessionState, Snapshot, StrokeState};

/// Default delay between polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3;
