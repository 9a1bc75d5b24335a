//! Snapshot: one composed poll of the erg

use ergcast_records::{MonitorReading, WorkoutInfo};
use serde::{Deserialize, Serialize};

use crate::device::ForcePlot;
use crate::error::{DeviceError, Result};

/// Workout lifecycle as reported by the device's `state` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// `state == 0`: ready, no workout running
    Idle,
    /// `state == 1`
    Active,
    /// Any other value
    Ended,
}

impl SessionState {
    pub fn from_raw(state: i64) -> Self {
        match state {
            0 => Self::Idle,
            1 => Self::Active,
            _ => Self::Ended,
        }
    }
}

/// Device-reported stroke phase. Only `Drive` carries meaning for detection;
/// the rest are kept as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeState {
    /// 0: flywheel below minimum speed
    Finish,
    /// 1: waiting for the flywheel to accelerate
    Catch,
    /// 2: drive in progress
    Drive,
    /// 3: dwelling after the drive
    Dwelling,
    /// 4: recovery
    Recovery,
}

impl StrokeState {
    pub fn from_raw(state: i64) -> Option<Self> {
        match state {
            0 => Some(Self::Finish),
            1 => Some(Self::Catch),
            2 => Some(Self::Drive),
            3 => Some(Self::Dwelling),
            4 => Some(Self::Recovery),
            _ => None,
        }
    }

    pub fn ordinal(self) -> i64 {
        match self {
            Self::Finish => 0,
            Self::Catch => 1,
            Self::Drive => 2,
            Self::Dwelling => 3,
            Self::Recovery => 4,
        }
    }

    pub fn is_drive(self) -> bool {
        self == Self::Drive
    }
}

/// One polled reading. Immutable once composed.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub session_state: SessionState,
    pub stroke_state: StrokeState,
    pub monitor: MonitorReading,
    pub workout: WorkoutInfo,
    /// Force samples taken since the previous snapshot
    pub force_sample: Vec<f64>,
}

impl Snapshot {
    /// Compose the three raw reads, rejecting inconsistent ones.
    pub fn compose(workout: WorkoutInfo, monitor: MonitorReading, plot: ForcePlot) -> Result<Self> {
        let stroke_state = StrokeState::from_raw(plot.stroke_state).ok_or_else(|| {
            DeviceError::malformed(format!("unknown strokestate {}", plot.stroke_state))
        })?;

        if let Some(bad) = plot.force.iter().find(|f| !f.is_finite()) {
            return Err(DeviceError::malformed(format!("non-finite force sample {}", bad)));
        }

        Ok(Self {
            session_state: SessionState::from_raw(workout.state),
            stroke_state,
            monitor,
            workout,
            force_sample: plot.force,
        })
    }

    pub fn is_active(&self) -> bool {
        self.session_state == SessionState::Active
    }

    pub fn is_drive(&self) -> bool {
        self.stroke_state.is_drive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout(state: i64) -> WorkoutInfo {
        WorkoutInfo {
            state,
            ..Default::default()
        }
    }

    #[test]
    fn test_session_state_mapping() {
        assert_eq!(SessionState::from_raw(0), SessionState::Idle);
        assert_eq!(SessionState::from_raw(1), SessionState::Active);
        assert_eq!(SessionState::from_raw(2), SessionState::Ended);
        assert_eq!(SessionState::from_raw(-1), SessionState::Ended);
    }

    #[test]
    fn test_stroke_state_ordinals() {
        for raw in 0..5 {
            let state = StrokeState::from_raw(raw).unwrap();
            assert_eq!(state.ordinal(), raw);
        }
        assert!(StrokeState::from_raw(2).unwrap().is_drive());
        assert!(StrokeState::from_raw(5).is_none());
    }

    #[test]
    fn test_compose() {
        let plot = ForcePlot {
            stroke_state: 2,
            force: vec![12.0, 14.0],
        };
        let snapshot = Snapshot::compose(workout(1), MonitorReading::default(), plot).unwrap();
        assert!(snapshot.is_active());
        assert!(snapshot.is_drive());
        assert_eq!(snapshot.force_sample, vec![12.0, 14.0]);
    }

    #[test]
    fn test_compose_rejects_unknown_stroke_state() {
        let plot = ForcePlot {
            stroke_state: 7,
            force: vec![],
        };
        let err = Snapshot::compose(workout(1), MonitorReading::default(), plot).unwrap_err();
        assert!(matches!(err, DeviceError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_compose_rejects_nan_force() {
        let plot = ForcePlot {
            stroke_state: 2,
            force: vec![1.0, f64::NAN],
        };
        let err = Snapshot::compose(workout(1), MonitorReading::default(), plot).unwrap_err();
        assert!(!err.is_fatal());
    }
}
