use std::fmt;

use rollcall_core::CoreError;

#[derive(Debug)]
pub enum IoError {
    /// Neither a delimited-text nor a workbook extension: a configuration
    /// error, not a recoverable condition.
    UnrecognizedFormat { path: String },
    /// File read error.
    Read { path: String, detail: String },
    /// CSV structure error.
    Csv(String),
    /// Workbook open/read error.
    Workbook(String),
    /// Error raised by the core while building the table.
    Core(CoreError),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedFormat { path } => {
                write!(f, "unrecognized input format: '{path}'")
            }
            Self::Read { path, detail } => write!(f, "cannot read '{path}': {detail}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Workbook(msg) => write!(f, "workbook error: {msg}"),
            Self::Core(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<CoreError> for IoError {
    fn from(err: CoreError) -> IoError {
        IoError::Core(err)
    }
}
