//! CSV workout log export and import
//!
//! The format is header driven: import looks columns up by name, so logs with
//! reordered monitor columns still load. The `forceplot` column, when present,
//! must be last and swallows every remaining value on the row.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, TimeZone};

use crate::error::{RecordsError, Result};
use crate::models::{MonitorReading, StrokeRecord};

/// Monitor columns in export order
pub const MONITOR_FIELDS: [&str; 9] = [
    "time",
    "distance",
    "spm",
    "power",
    "pace",
    "calhr",
    "calories",
    "heartrate",
    "status",
];

/// Trailing column holding the force curve
pub const FORCEPLOT_FIELD: &str = "forceplot";

/// One row of a workout log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedStroke {
    pub monitor: MonitorReading,
    pub force_curve: Vec<f64>,
}

impl From<&StrokeRecord> for LoggedStroke {
    /// Logs keep the reading taken when the drive began.
    fn from(stroke: &StrokeRecord) -> Self {
        Self {
            monitor: stroke.monitor_at_start,
            force_curve: stroke.force_curve.clone(),
        }
    }
}

/// `workout_YYYYMMDD_HHMM.csv` for a session that ended at `at`
pub fn workout_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("workout_{}.csv", at.format("%Y%m%d_%H%M"))
}

/// Write a header line followed by one row per stroke.
pub fn export_workout<W: Write>(mut writer: W, strokes: &[LoggedStroke]) -> Result<()> {
    writeln!(writer, "{},{}", MONITOR_FIELDS.join(","), FORCEPLOT_FIELD)?;

    for stroke in strokes {
        let mut row = String::new();
        for name in MONITOR_FIELDS {
            row.push_str(&format_field(&stroke.monitor, name));
            row.push(',');
        }
        let force: Vec<String> = stroke.force_curve.iter().map(|f| f.to_string()).collect();
        row.push_str(&force.join(","));
        writeln!(writer, "{}", row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_workout_file(path: impl AsRef<Path>, strokes: &[LoggedStroke]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    export_workout(BufWriter::new(file), strokes)?;
    tracing::info!(
        "Workout log written to {} ({} strokes)",
        path.as_ref().display(),
        strokes.len()
    );
    Ok(())
}

/// Read a workout log back into strokes.
pub fn import_workout<R: BufRead>(reader: R) -> Result<Vec<LoggedStroke>> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(RecordsError::EmptyLog),
    };
    let columns: Vec<&str> = header.trim_end_matches('\r').split(',').map(str::trim).collect();

    for name in MONITOR_FIELDS {
        if !columns.contains(&name) {
            return Err(RecordsError::MissingField(name.to_string()));
        }
    }

    let force_column = columns.iter().position(|c| *c == FORCEPLOT_FIELD);
    if let Some(idx) = force_column {
        if idx != columns.len() - 1 {
            return Err(RecordsError::parse(1, "forceplot must be the last column"));
        }
    }

    let mut strokes = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line_no = offset + 2;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        let mut monitor = MonitorReading::default();

        for (idx, name) in columns.iter().enumerate() {
            if Some(idx) == force_column {
                break;
            }
            let value = values.get(idx).ok_or_else(|| {
                RecordsError::parse(line_no, format!("missing value for '{}'", name))
            })?;
            if MONITOR_FIELDS.contains(name) {
                parse_field(&mut monitor, name, value)
                    .map_err(|message| RecordsError::parse(line_no, message))?;
            } else {
                tracing::debug!("Ignoring unknown workout log column '{}'", name);
            }
        }

        let mut force_curve = Vec::new();
        if let Some(idx) = force_column {
            for value in values.iter().skip(idx).filter(|v| !v.is_empty()) {
                let force = value.parse::<f64>().map_err(|e| {
                    RecordsError::parse(line_no, format!("bad force value '{}': {}", value, e))
                })?;
                force_curve.push(force);
            }
        }

        strokes.push(LoggedStroke {
            monitor,
            force_curve,
        });
    }

    Ok(strokes)
}

pub fn import_workout_file(path: impl AsRef<Path>) -> Result<Vec<LoggedStroke>> {
    let file = File::open(path.as_ref())?;
    import_workout(BufReader::new(file))
}

fn format_field(monitor: &MonitorReading, name: &str) -> String {
    match name {
        "time" => monitor.elapsed_time.to_string(),
        "distance" => monitor.distance.to_string(),
        "spm" => monitor.strokes_per_minute.to_string(),
        "power" => monitor.power.to_string(),
        "pace" => monitor.pace.to_string(),
        "calhr" => monitor.calories_per_hour.to_string(),
        "calories" => monitor.calories.to_string(),
        "heartrate" => monitor.heart_rate.to_string(),
        "status" => monitor.machine_status.to_string(),
        _ => String::new(),
    }
}

fn parse_field(
    monitor: &mut MonitorReading,
    name: &str,
    value: &str,
) -> std::result::Result<(), String> {
    fn float(name: &str, value: &str) -> std::result::Result<f64, String> {
        value
            .parse::<f64>()
            .map_err(|e| format!("bad value '{}' for '{}': {}", value, name, e))
    }
    fn int(name: &str, value: &str) -> std::result::Result<u32, String> {
        value
            .parse::<u32>()
            .map_err(|e| format!("bad value '{}' for '{}': {}", value, name, e))
    }

    match name {
        "time" => monitor.elapsed_time = float(name, value)?,
        "distance" => monitor.distance = float(name, value)?,
        "spm" => monitor.strokes_per_minute = int(name, value)?,
        "power" => monitor.power = int(name, value)?,
        "pace" => monitor.pace = float(name, value)?,
        "calhr" => monitor.calories_per_hour = float(name, value)?,
        "calories" => monitor.calories = int(name, value)?,
        "heartrate" => monitor.heart_rate = int(name, value)?,
        "status" => monitor.machine_status = int(name, value)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SAMPLE_LOG: &str = "time,distance,spm,power,pace,calhr,calories,heartrate,status,forceplot\n\
        1.3,2.0,0,0,0,0,0,0,9,3,3,12,12,12\n\
        2.82,4.2,50,10,327.106631019,334.416,0,0,9,8,12,12\n\
        20.75,40.6,20,53,187.613488248,482.4048,1,0,1,\n";

    #[test]
    fn test_import_sample_log() {
        let strokes = import_workout(SAMPLE_LOG.as_bytes()).unwrap();
        assert_eq!(strokes.len(), 3);

        assert_eq!(strokes[0].monitor.elapsed_time, 1.3);
        assert_eq!(strokes[0].monitor.machine_status, 9);
        assert_eq!(strokes[0].force_curve, vec![3.0, 3.0, 12.0, 12.0, 12.0]);

        assert_eq!(strokes[1].monitor.strokes_per_minute, 50);
        assert_eq!(strokes[1].monitor.pace, 327.106631019);
        assert_eq!(strokes[1].monitor.calories_per_hour, 334.416);

        // Trailing empty forceplot cell
        assert!(strokes[2].force_curve.is_empty());
        assert_eq!(strokes[2].monitor.calories, 1);
    }

    #[test]
    fn test_export_header_and_trailing_force() {
        let stroke = LoggedStroke {
            monitor: MonitorReading {
                elapsed_time: 7.24,
                distance: 10.1,
                strokes_per_minute: 41,
                ..Default::default()
            },
            force_curve: vec![3.0, 10.0, 20.5],
        };

        let mut out = Vec::new();
        export_workout(&mut out, &[stroke]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "time,distance,spm,power,pace,calhr,calories,heartrate,status,forceplot"
        );
        assert_eq!(lines.next().unwrap(), "7.24,10.1,41,0,0,0,0,0,0,3,10,20.5");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_reordered_columns_without_forceplot() {
        let log = "spm,time,distance,power,pace,calhr,calories,heartrate,status\n\
            30,5.5,20,120,120.5,400,3,150,1\n";
        let strokes = import_workout(log.as_bytes()).unwrap();
        assert_eq!(strokes[0].monitor.strokes_per_minute, 30);
        assert_eq!(strokes[0].monitor.elapsed_time, 5.5);
        assert!(strokes[0].force_curve.is_empty());
    }

    #[test]
    fn test_missing_header_field() {
        let log = "time,distance\n1,2\n";
        match import_workout(log.as_bytes()) {
            Err(RecordsError::MissingField(name)) => assert_eq!(name, "spm"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_log() {
        assert!(matches!(
            import_workout("".as_bytes()),
            Err(RecordsError::EmptyLog)
        ));
    }

    #[test]
    fn test_bad_value_reports_line() {
        let log = "time,distance,spm,power,pace,calhr,calories,heartrate,status,forceplot\n\
            1.0,2.0,0,0,0,0,0,0,9,1,2\n\
            1.0,2.0,fast,0,0,0,0,0,9,1,2\n";
        match import_workout(log.as_bytes()) {
            Err(RecordsError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("spm"));
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_forceplot_not_last_is_rejected() {
        let log = "forceplot,time,distance,spm,power,pace,calhr,calories,heartrate,status\n";
        assert!(matches!(
            import_workout(log.as_bytes()),
            Err(RecordsError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_logged_stroke_uses_start_monitor() {
        let start = MonitorReading {
            elapsed_time: 4.0,
            ..Default::default()
        };
        let stroke = StrokeRecord::open(0, start, &[1.0]).close(MonitorReading {
            elapsed_time: 5.0,
            ..Default::default()
        });
        let logged = LoggedStroke::from(&stroke);
        assert_eq!(logged.monitor.elapsed_time, 4.0);
        assert_eq!(logged.force_curve, vec![1.0]);
    }

    #[test]
    fn test_workout_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(workout_file_name(&at), "workout_20240309_0705.csv");
    }
}
