//! Device collaborator boundary
//!
//! Mirrors the erg driver's surface: enumerate, open, then three raw reads.

use ergcast_records::{MonitorReading, WorkoutInfo};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque reference to an erg found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: String,
    pub description: String,
}

/// Identity reported by an opened erg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErgInfo {
    pub model: String,
    pub serial: String,
}

/// Raw force plot read: current stroke state plus samples taken since the
/// previous read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForcePlot {
    #[serde(rename = "strokestate")]
    pub stroke_state: i64,

    #[serde(rename = "forceplot")]
    pub force: Vec<f64>,
}

/// An opened erg. Every read may block for device-bound time.
pub trait ErgDevice: Send {
    fn info(&mut self) -> Result<ErgInfo>;

    fn get_workout(&mut self) -> Result<WorkoutInfo>;

    fn get_monitor(&mut self) -> Result<MonitorReading>;

    fn get_force_plot(&mut self) -> Result<ForcePlot>;
}

impl<D: ErgDevice + ?Sized> ErgDevice for Box<D> {
    fn info(&mut self) -> Result<ErgInfo> {
        (**self).info()
    }

    fn get_workout(&mut self) -> Result<WorkoutInfo> {
        (**self).get_workout()
    }

    fn get_monitor(&mut self) -> Result<MonitorReading> {
        (**self).get_monitor()
    }

    fn get_force_plot(&mut self) -> Result<ForcePlot> {
        (**self).get_force_plot()
    }
}

/// Enumerates and opens ergs
pub trait DeviceProvider: Send + Sync {
    fn find(&self) -> Result<Vec<DeviceHandle>>;

    fn open(&self, handle: &DeviceHandle) -> Result<Box<dyn ErgDevice>>;
}
