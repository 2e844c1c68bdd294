//! Host wire protocol
//!
//! Newline-delimited JSON messages, one object per line, tagged by `type`.
//! Every request that expects an answer carries an `id` that the host
//! echoes back, which lets the client drop answers to requests it already
//! gave up on.

use serde::{Deserialize, Serialize};

/// Message from the client to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostRequest {
    /// Handshake sent once after connecting
    Hello {
        /// Client identifier
        client_id: String,
    },

    /// Run a command for its side effects
    Execute {
        /// Request ID for matching responses
        id: u64,
        /// Command string to execute
        command: String,
    },

    /// Run a command and return its value
    Query {
        /// Request ID for matching responses
        id: u64,
        /// Command string to evaluate
        command: String,
    },

    /// Health check
    Ping {
        /// Request ID
        id: u64,
    },

    /// Ask the host to shut down
    Quit,
}

/// Message from the host to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostResponse {
    /// Command executed successfully
    Ok {
        /// Request ID this is responding to
        id: u64,
    },

    /// Command failed
    Error {
        /// Request ID this is responding to
        id: u64,
        /// Error message
        message: String,
    },

    /// Return value of a query
    Value {
        /// Request ID this is responding to
        id: u64,
        /// The value as JSON
        value: serde_json::Value,
    },

    /// Pong response to Ping
    Pong {
        /// Request ID this is responding to
        id: u64,
    },

    /// Host is shutting down
    Closing,
}

impl HostRequest {
    /// Get the request ID if this request has one
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Execute { id, .. } | Self::Query { id, .. } | Self::Ping { id } => Some(*id),
            Self::Hello { .. } | Self::Quit => None,
        }
    }
}

impl HostResponse {
    /// Get the request ID if this response has one
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Ok { id } | Self::Error { id, .. } | Self::Value { id, .. } | Self::Pong { id } => {
                Some(*id)
            }
            Self::Closing => None,
        }
    }
}
