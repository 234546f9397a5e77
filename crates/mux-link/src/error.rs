//! Error types for the serial link

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during a command exchange
#[derive(Debug, Error)]
pub enum LinkError {
    /// No response line arrived within the timeout window
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The link is not open, or the reader has already exited
    #[error("link is not open")]
    Closed,

    /// I/O error while writing the command
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
