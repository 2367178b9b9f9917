use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BenchError {
    #[error("Timer stopped without a started phase")]
    InvalidTimerState,
    #[error("{adapter} does not support operation '{operation}'")]
    UnsupportedOperation { adapter: String, operation: String },
    #[error("{adapter} failed: {message}")]
    AdapterFailure { adapter: String, message: String },
    #[error("Progress line was not rendered within {0:?}")]
    ProgressChannelTimeout(Duration),
    #[error("Progress channel closed by the presentation side")]
    ProgressChannelClosed,
    #[error("Suite worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("A suite is already running")]
    AlreadyRunning,
    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl BenchError {
    pub fn adapter(adapter: &str, message: impl Into<String>) -> Self {
        BenchError::AdapterFailure {
            adapter: adapter.to_string(),
            message: message.into(),
        }
    }

    /// Errors after which no further progress can be reported, so the whole
    /// suite has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BenchError::ProgressChannelTimeout(_) | BenchError::ProgressChannelClosed
        )
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::IoError(err.to_string())
    }
}

impl From<rusqlite::Error> for BenchError {
    fn from(err: rusqlite::Error) -> Self {
        BenchError::adapter("sqlite", err.to_string())
    }
}
