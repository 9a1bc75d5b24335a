//! Error types for device access

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No ergs found")]
    NoDevice,

    /// The erg disappeared or the transport faulted. A disconnected machine
    /// does not come back in-process.
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// One poll returned an internally inconsistent reading
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Replay log error: {0}")]
    Replay(#[from] ergcast_records::RecordsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedSnapshot(msg.into())
    }

    /// Whether the sampling loop has to stop. Only a malformed snapshot can be
    /// skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedSnapshot(_))
    }
}
