//! Error types for table and log I/O
//!
//! Provides error types for reading and writing record tables, CSV logs
//! and AlphaFold model files.

use thiserror::Error;

/// Errors that can occur during table and log I/O
#[derive(Error, Debug)]
pub enum IoError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The table does not have the expected shape
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// A column the caller relies on is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Parse error with location information
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Error message
        message: String,
    },
}

impl IoError {
    /// Create a malformed-table error
    pub fn malformed(message: impl Into<String>) -> Self {
        IoError::MalformedTable(message.into())
    }

    /// Create a missing-column error
    pub fn missing_column(column: impl Into<String>) -> Self {
        IoError::MissingColumn(column.into())
    }

    /// Create a parse error at a specific line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for table and log I/O operations
pub type IoResult<T> = Result<T, IoError>;
