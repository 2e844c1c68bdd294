//! Error types for the host session
//!
//! Distinguishes failures of the channel to the host (which may be
//! transient and worth one retry) from errors the host reports for a
//! command it did run.

use std::time::Duration;

use thiserror::Error;

/// Result type for host operations
pub type HostResult<T = ()> = Result<T, HostError>;

/// Errors that can occur while talking to the geometry host
#[derive(Debug, Error)]
pub enum HostError {
    /// Socket or pipe I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response arrived in time
    #[error("host did not respond within {0:?}")]
    Timeout(Duration),

    /// The host answered with something that cannot be interpreted
    #[error("malformed host response: {0}")]
    Malformed(String),

    /// The host closed the session
    #[error("host closed the connection")]
    Closed,

    /// Could not reach or start the host
    #[error("connection failed: {0}")]
    Connection(String),

    /// The host ran the command and reported an error
    #[error("{0}")]
    Command(String),

    /// A handle that is not (or no longer) open was used
    #[error("unknown structure handle #{0}")]
    UnknownHandle(u32),
}

impl HostError {
    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        HostError::Malformed(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        HostError::Command(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        HostError::Connection(msg.into())
    }

    /// Whether this is a failure of the channel rather than of the command
    ///
    /// Communication failures are retried once by callers.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            HostError::Io(_) | HostError::Timeout(_) | HostError::Malformed(_) | HostError::Closed
        )
    }
}
