//! Sampling loop: device → state machines → broadcaster
//!
//! Runs on one blocking thread. Publishing never blocks on subscribers, so the
//! poll cadence only depends on the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ergcast_broadcaster::EventBroadcaster;
use ergcast_detect::{Event, SessionStateMachine};
use ergcast_device::{DeviceError, DeviceProvider, Sampler, SamplerConfig};
use tracing::{debug, error, info, warn};

use crate::recorder::WorkoutRecorder;

pub const NO_DEVICE_TEXT: &str = "No ergs found.";
pub const DEVICE_ERROR_TEXT: &str = "Error reading data from erg. Closing connection.";

/// How the sampling loop finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Nothing to sample; no polling happened
    NoDevice,
    /// Shutdown was requested
    Stopped,
    /// Unrecoverable device error
    DeviceLost(String),
}

pub struct SamplingLoop {
    provider: Box<dyn DeviceProvider>,
    broadcaster: Arc<EventBroadcaster>,
    poll_interval: Duration,
    recorder: Option<WorkoutRecorder>,
    shutdown: Arc<AtomicBool>,
}

impl SamplingLoop {
    pub fn new(
        provider: Box<dyn DeviceProvider>,
        broadcaster: Arc<EventBroadcaster>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            broadcaster,
            poll_interval,
            recorder: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_recorder(mut self, recorder: WorkoutRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Flag that stops the loop after the current poll when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run until shutdown or device loss. Blocking.
    pub fn run(mut self) -> Result<PipelineOutcome> {
        let handles = self.provider.find().context("Failed to enumerate ergs")?;
        let Some(handle) = handles.first() else {
            warn!("{}", NO_DEVICE_TEXT);
            self.emit(&Event::notice(NO_DEVICE_TEXT));
            return Ok(PipelineOutcome::NoDevice);
        };

        let device = self
            .provider
            .open(handle)
            .with_context(|| format!("Failed to open erg {}", handle.id))?;
        let config = SamplerConfig::default().with_poll_interval(self.poll_interval);
        let mut sampler = Sampler::new(device, config);

        let info = sampler.erg_info().context("Failed to identify erg")?;
        let connected = format!("Concept 2 erg connected (model {}, serial {})", info.model, info.serial);
        info!("🚣 {}", connected);
        self.emit(&Event::notice(connected));

        let mut machine = SessionStateMachine::new(info.serial);
        let interval = sampler.poll_interval();

        while !self.shutdown.load(Ordering::SeqCst) {
            match sampler.poll() {
                Ok(snapshot) => {
                    for event in machine.observe(&snapshot) {
                        self.emit(&event);
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!("Skipping snapshot: {}", e);
                }
                Err(e) => return Ok(self.device_lost(&mut machine, e)),
            }

            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        for event in machine.abort() {
            self.emit(&event);
        }
        info!("Sampling stopped after {} polls", sampler.polls());
        Ok(PipelineOutcome::Stopped)
    }

    fn device_lost(&mut self, machine: &mut SessionStateMachine, e: DeviceError) -> PipelineOutcome {
        error!("Erg {} lost: {}", machine.erg_id(), e);
        for event in machine.abort() {
            self.emit(&event);
        }
        self.emit(&Event::notice(DEVICE_ERROR_TEXT));
        PipelineOutcome::DeviceLost(e.to_string())
    }

    fn emit(&mut self, event: &Event) {
        match self.broadcaster.publish(event) {
            Ok(report) => debug!(
                "{} → {} subscriber(s), {} dropped",
                event.kind(),
                report.delivered,
                report.dropped.len()
            ),
            Err(e) => warn!("Failed to publish {}: {}", event.kind(), e),
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(event) {
                warn!("Failed to export workout: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergcast_broadcaster::ChannelSubscriber;
    use ergcast_device::{ScriptedErg, ScriptedFrame, ScriptedProvider};

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<Arc<str>>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(json) = rx.try_recv() {
            out.push(serde_json::from_str(&json).unwrap());
        }
        out
    }

    #[test]
    fn test_no_device_single_report() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let (sub, mut rx) = ChannelSubscriber::new(16, "test");
        broadcaster.subscribe(sub);

        let outcome = SamplingLoop::new(
            Box::new(ScriptedProvider::empty()),
            Arc::clone(&broadcaster),
            Duration::ZERO,
        )
        .run()
        .unwrap();

        assert_eq!(outcome, PipelineOutcome::NoDevice);
        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], NO_DEVICE_TEXT);
    }

    #[test]
    fn test_device_loss_closes_open_stroke_and_session() {
        let erg = ScriptedErg::new(
            "PM5",
            "42",
            vec![
                ScriptedFrame::new(1, 2, &[1.0]),
                ScriptedFrame::new(1, 2, &[2.0]),
                ScriptedFrame::fault(),
            ],
        );
        let broadcaster = Arc::new(EventBroadcaster::new());
        let (sub, mut rx) = ChannelSubscriber::new(64, "test");
        broadcaster.subscribe(sub);

        let outcome = SamplingLoop::new(
            Box::new(ScriptedProvider::new(vec![erg])),
            Arc::clone(&broadcaster),
            Duration::ZERO,
        )
        .run()
        .unwrap();

        assert!(matches!(outcome, PipelineOutcome::DeviceLost(_)));

        let types: Vec<String> = drain(&mut rx)
            .iter()
            .map(|m| m["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "TXT",
                "WORKOUT_START",
                "STROKE_START",
                "STROKE_FORCE",
                "STROKE_FORCE",
                "STROKE_END",
                "WORKOUT_END",
                "TXT",
            ]
        );
    }

    #[test]
    fn test_shutdown_flag_stops_loop() {
        let frames = (0..10_000).map(|_| ScriptedFrame::new(0, 0, &[])).collect();
        let erg = ScriptedErg::new("PM5", "42", frames);
        let broadcaster = Arc::new(EventBroadcaster::new());

        let sampling = SamplingLoop::new(
            Box::new(ScriptedProvider::new(vec![erg])),
            broadcaster,
            Duration::from_millis(1),
        );
        let shutdown = sampling.shutdown_handle();
        shutdown.store(true, Ordering::SeqCst);

        assert_eq!(sampling.run().unwrap(), PipelineOutcome::Stopped);
    }
}
