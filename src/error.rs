use std::fmt::{self, Display};
use std::io;

/// Provides `SirError` and maps to other errors to
/// convert to a `SirError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SirError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// Invalid construction parameters. Reported before any simulation work begins.
    ConfigurationError(String),
    ReportError(String),
}

impl SirError {
    pub(crate) fn configuration(parameter: &str, reason: impl Display) -> SirError {
        SirError::ConfigurationError(format!("{parameter}: {reason}"))
    }
}

impl From<io::Error> for SirError {
    fn from(error: io::Error) -> Self {
        SirError::IoError(error)
    }
}

impl From<serde_json::Error> for SirError {
    fn from(error: serde_json::Error) -> Self {
        SirError::JsonError(error)
    }
}

impl From<csv::Error> for SirError {
    fn from(error: csv::Error) -> Self {
        SirError::CSVError(error)
    }
}

impl std::error::Error for SirError {}

impl Display for SirError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SirError::IoError(error) => write!(f, "I/O error: {error}"),
            SirError::JsonError(error) => write!(f, "JSON error: {error}"),
            SirError::CSVError(error) => write!(f, "CSV error: {error}"),
            SirError::ConfigurationError(message) => {
                write!(f, "Configuration error: {message}")
            }
            SirError::ReportError(message) => write!(f, "Report error: {message}"),
        }
    }
}
