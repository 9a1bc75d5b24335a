use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workout log is empty (no header line)")]
    EmptyLog,

    #[error("Workout log header is missing field '{0}'")]
    MissingField(String),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl RecordsError {
    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordsError>;
