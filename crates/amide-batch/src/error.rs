//! Error types for batch runs
//!
//! [`BatchError`] aborts a run; [`RecordError`] fails one row and is
//! logged while the run continues.

use std::path::PathBuf;

use amide_analysis::AnalysisError;
use amide_io::IoError;
use thiserror::Error;

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that abort a batch run
#[derive(Debug, Error)]
pub enum BatchError {
    /// Table or log I/O failed
    #[error(transparent)]
    Io(#[from] IoError),

    /// An input or output file could not be opened
    #[error("cannot open {path:?}: {source}")]
    File {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The run configuration is invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The run configuration is not valid TOML
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BatchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BatchError::Config(msg.into())
    }

    /// Create a file error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::File {
            path: path.into(),
            source,
        }
    }
}

/// Why one row could not be populated
#[derive(Debug, Error)]
pub enum RecordError {
    /// A required input cell is blank or unreadable
    #[error("{0} not found")]
    MissingInput(String),

    /// An input cell holds something that cannot be interpreted
    #[error("invalid {column}: {message}")]
    InvalidInput {
        /// Column of the offending cell
        column: String,
        /// What was wrong with it
        message: String,
    },

    /// Analysis of the residue failed
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_display() {
        assert_eq!(
            RecordError::MissingInput("aa_position".into()).to_string(),
            "aa_position not found"
        );
        let err: RecordError = AnalysisError::PositionNotFound("P68871, /A@58".into()).into();
        assert_eq!(
            err.to_string(),
            "AA position not found in protein: P68871, /A@58"
        );
    }
}
