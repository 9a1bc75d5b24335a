//! ErgCast daemon library
//!
//! Wires the sampler, the detection state machines and the broadcaster
//! together. The binary in `main.rs` adds CLI parsing, logging and signal
//! handling on top.

pub mod config;
pub mod pipeline;
pub mod recorder;

pub use config::{DaemonConfig, DeliveryBackend};
pub use pipeline::{PipelineOutcome, SamplingLoop, DEVICE_ERROR_TEXT, NO_DEVICE_TEXT};
pub use recorder::WorkoutRecorder;

/// Sent to every subscriber right before the daemon exits
pub const SHUTDOWN_TEXT: &str = "ErgCast server closing. See you next time!";
