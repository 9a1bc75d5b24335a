//! Scripted erg: plays back a fixed list of raw frames
//!
//! One frame is consumed per poll (by the force plot read, the last of the
//! three). When the script runs out, or a fault frame is reached, every read
//! fails with `DeviceError::Unavailable`, like an erg that was unplugged.

use std::collections::VecDeque;

use ergcast_records::{MonitorReading, WorkoutInfo};
use parking_lot::Mutex;

use crate::device::{DeviceHandle, DeviceProvider, ErgDevice, ErgInfo, ForcePlot};
use crate::error::{DeviceError, Result};

/// Raw values returned by one poll
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedFrame {
    pub workout_state: i64,
    pub stroke_state: i64,
    pub monitor: MonitorReading,
    pub force: Vec<f64>,
    pub fault: bool,
}

impl ScriptedFrame {
    pub fn new(workout_state: i64, stroke_state: i64, force: &[f64]) -> Self {
        Self {
            workout_state,
            stroke_state,
            monitor: MonitorReading::default(),
            force: force.to_vec(),
            fault: false,
        }
    }

    /// A frame whose reads fail at the transport level
    pub fn fault() -> Self {
        Self {
            fault: true,
            ..Self::new(0, 0, &[])
        }
    }

    pub fn with_monitor(mut self, monitor: MonitorReading) -> Self {
        self.monitor = monitor;
        self
    }
}

pub struct ScriptedErg {
    info: ErgInfo,
    frames: VecDeque<ScriptedFrame>,
}

impl ScriptedErg {
    pub fn new(model: impl Into<String>, serial: impl Into<String>, frames: Vec<ScriptedFrame>) -> Self {
        Self {
            info: ErgInfo {
                model: model.into(),
                serial: serial.into(),
            },
            frames: frames.into(),
        }
    }

    /// Frames not yet consumed
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn current(&self) -> Result<&ScriptedFrame> {
        match self.frames.front() {
            Some(frame) if frame.fault => Err(DeviceError::unavailable("transport fault")),
            Some(frame) => Ok(frame),
            None => Err(DeviceError::unavailable("erg disconnected")),
        }
    }
}

impl ErgDevice for ScriptedErg {
    fn info(&mut self) -> Result<ErgInfo> {
        Ok(self.info.clone())
    }

    fn get_workout(&mut self) -> Result<WorkoutInfo> {
        let frame = self.current()?;
        Ok(WorkoutInfo {
            state: frame.workout_state,
            ..Default::default()
        })
    }

    fn get_monitor(&mut self) -> Result<MonitorReading> {
        Ok(self.current()?.monitor)
    }

    fn get_force_plot(&mut self) -> Result<ForcePlot> {
        self.current()?;
        let frame = self
            .frames
            .pop_front()
            .ok_or_else(|| DeviceError::unavailable("erg disconnected"))?;
        Ok(ForcePlot {
            stroke_state: frame.stroke_state,
            force: frame.force,
        })
    }
}

/// Provider handing out pre-built scripted ergs, each at most once.
pub struct ScriptedProvider {
    ergs: Mutex<Vec<(DeviceHandle, Option<ScriptedErg>)>>,
}

impl ScriptedProvider {
    pub fn new(ergs: Vec<ScriptedErg>) -> Self {
        let ergs = ergs
            .into_iter()
            .map(|erg| {
                let handle = DeviceHandle {
                    id: erg.info.serial.clone(),
                    description: format!("scripted {} ({} frames)", erg.info.model, erg.remaining()),
                };
                (handle, Some(erg))
            })
            .collect();

        Self {
            ergs: Mutex::new(ergs),
        }
    }

    /// A provider that finds nothing
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DeviceProvider for ScriptedProvider {
    fn find(&self) -> Result<Vec<DeviceHandle>> {
        Ok(self.ergs.lock().iter().map(|(handle, _)| handle.clone()).collect())
    }

    fn open(&self, handle: &DeviceHandle) -> Result<Box<dyn ErgDevice>> {
        let mut ergs = self.ergs.lock();
        let slot = ergs
            .iter_mut()
            .find(|(h, _)| h == handle)
            .ok_or_else(|| DeviceError::unavailable(format!("unknown device {}", handle.id)))?;

        let erg = slot
            .1
            .take()
            .ok_or_else(|| DeviceError::unavailable(format!("device {} already open", handle.id)))?;
        tracing::debug!("Opened {}", handle.description);
        Ok(Box::new(erg))
    }
}
