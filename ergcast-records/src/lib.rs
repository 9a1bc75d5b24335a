//! ErgCast records
//!
//! Plain value types shared by every stage of the pipeline (monitor readings,
//! workout info, finalized strokes and sessions) and the CSV workout log used
//! to export completed sessions and replay them later.
//!
//! ## Workout log format
//!
//! ```text
//! time,distance,spm,power,pace,calhr,calories,heartrate,status,forceplot
//! 2.82,4.2,50,10,327.106631019,334.416,0,0,9,8,12,12,12,14,14,13
//! ```
//!
//! One header line, then one row per stroke. The force curve trails the
//! monitor fields as a variable number of comma-separated values.

pub mod error;
pub mod models;
pub mod workout_log;

pub use error::{RecordsError, Result};
pub use models::{MonitorReading, SessionRecord, StrokeRecord, WorkoutInfo};
pub use workout_log::{
    export_workout, export_workout_file, import_workout, import_workout_file, workout_file_name,
    LoggedStroke, FORCEPLOT_FIELD, MONITOR_FIELDS,
};
