//! Fixed-cadence snapshot sampler
//!
//! No buffering and no interpretation: each [`Sampler::poll`] issues the three
//! device reads in order and composes one [`Snapshot`].

use std::time::Duration;

use crate::device::{ErgDevice, ErgInfo};
use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::DEFAULT_POLL_INTERVAL_MS;

/// Sampler configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Delay between polls (default: 3ms)
    pub poll_interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl SamplerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Owns the opened erg for the lifetime of the sampling loop; dropping the
/// sampler releases the device.
pub struct Sampler {
    device: Box<dyn ErgDevice>,
    config: SamplerConfig,
    polls: u64,
}

impl Sampler {
    pub fn new(device: Box<dyn ErgDevice>, config: SamplerConfig) -> Self {
        Self {
            device,
            config,
            polls: 0,
        }
    }

    /// Identify the erg behind this sampler
    pub fn erg_info(&mut self) -> Result<ErgInfo> {
        self.device.info()
    }

    /// Read workout, monitor and force plot, in that order.
    ///
    /// # Errors
    ///
    /// - `DeviceError::Unavailable` if any read fails at the transport level
    /// - `DeviceError::MalformedSnapshot` if the reads do not compose
    pub fn poll(&mut self) -> Result<Snapshot> {
        let workout = self.device.get_workout()?;
        let monitor = self.device.get_monitor()?;
        let plot = self.device.get_force_plot()?;
        self.polls += 1;

        Snapshot::compose(workout, monitor, plot)
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Number of completed device round trips
    pub fn polls(&self) -> u64 {
        self.polls
    }
}
