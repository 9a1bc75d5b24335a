//! Optional CSV export of finished workouts

use std::path::PathBuf;

use chrono::Local;
use ergcast_detect::Event;
use ergcast_records::{export_workout_file, workout_file_name, LoggedStroke, RecordsError};
use tracing::{info, warn};

/// Collects finalized strokes and writes one CSV per session on SessionEnd.
pub struct WorkoutRecorder {
    dir: PathBuf,
    strokes: Vec<LoggedStroke>,
}

impl WorkoutRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strokes: Vec::new(),
        }
    }

    /// Feed one event. Returns the written path when a session closes.
    pub fn record(&mut self, event: &Event) -> Result<Option<PathBuf>, RecordsError> {
        match event {
            Event::SessionStart { .. } => {
                self.strokes.clear();
                Ok(None)
            }
            Event::StrokeEnd { stroke, .. } => {
                self.strokes.push(LoggedStroke::from(stroke));
                Ok(None)
            }
            Event::SessionEnd { session, .. } => {
                if self.strokes.is_empty() {
                    warn!("No strokes recorded, skipping workout export");
                    return Ok(None);
                }

                let ended = session.ended_at.unwrap_or(session.started_at).with_timezone(&Local);
                let path = self.dir.join(workout_file_name(&ended));
                let strokes = std::mem::take(&mut self.strokes);

                export_workout_file(&path, &strokes)?;
                info!("💾 Saved {} strokes to {}", strokes.len(), path.display());
                Ok(Some(path))
            }
            _ => Ok(None),
        }
    }

    /// Strokes held for the current session
    pub fn pending(&self) -> usize {
        self.strokes.len()
    }
}
