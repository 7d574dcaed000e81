//! Error types for courier

use std::time::Duration;

use thiserror::Error;

use crate::bus::Pipeline;

/// The main error type for courier operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Enqueue attempted after the pipeline was shut down
    #[error("{0} pipeline is closed")]
    PipelineClosed(Pipeline),

    /// The sender failed to initiate delivery of a message
    #[error("Send error: {0}")]
    Send(String),

    /// The executor failed to handle a message
    #[error("Execute error: {0}")]
    Execute(String),

    /// A collaborator panicked while processing a message
    #[error("Collaborator panicked: {0}")]
    Panicked(String),

    /// Workers did not stop before the shutdown deadline
    #[error("Workers did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for courier operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_closed_display() {
        let err = Error::PipelineClosed(Pipeline::Outbound);
        assert_eq!(err.to_string(), "outbound pipeline is closed");
    }

    #[test]
    fn test_shutdown_timeout_display() {
        let err = Error::ShutdownTimeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Workers did not stop within 250ms");
    }
}
