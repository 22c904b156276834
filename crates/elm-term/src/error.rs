//! Error types for the terminal engine

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while configuring or running a session
#[derive(Debug, Error)]
pub enum TermError {
    /// Connection URL could not be parsed
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Terminator specification could not be parsed
    #[error("invalid terminator: {0}")]
    Terminator(String),

    /// A CLI flag value failed validation
    #[error("{0}")]
    InvalidArgument(String),

    /// Preferences file was present but unusable
    #[error("config file {path}: {message}")]
    Config {
        /// Path of the offending file
        path: String,
        /// What went wrong
        message: String,
    },

    /// The transport did not come up within the configured timeout
    #[error("connection timed out after {0:.1?}")]
    ConnectTimeout(Duration),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Transport or terminal I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
