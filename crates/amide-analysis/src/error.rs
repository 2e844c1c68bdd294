//! Error types for residue analysis
//!
//! Every variant is local to one record: the batch driver logs it and moves
//! on to the next row.

use amide_host::HostError;
use thiserror::Error;

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur while analyzing one residue
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Target position absent from the structure
    #[error("AA position not found in protein: {0}")]
    PositionNotFound(String),

    /// Neither the target nor the preceding residue is ASN/GLN
    #[error("N/Q not found in this AA or the preceding one: {0}")]
    ResidueTypeMismatch(String),

    /// Phi/psi undefined on the primary and the alternate source
    #[error("backbone torsion unavailable: {0}")]
    TorsionUnavailable(String),

    /// Every candidate structure and the predicted model failed
    #[error("all structure sources failed, tried {tried} files")]
    SourceExhausted {
        /// Number of experimental structures attempted
        tried: usize,
    },

    /// The channel to the host failed twice in a row
    #[error("host communication failed: {0}")]
    HostCommunication(#[source] HostError),

    /// The host ran a command and reported an error
    #[error("{0}")]
    HostCommand(#[source] HostError),
}

impl From<HostError> for AnalysisError {
    fn from(err: HostError) -> Self {
        if err.is_communication() {
            AnalysisError::HostCommunication(err)
        } else {
            AnalysisError::HostCommand(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_host_error_classification() {
        let err: AnalysisError = HostError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, AnalysisError::HostCommunication(_)));

        let err: AnalysisError = HostError::command("Fetching 9zzz failed").into();
        assert!(matches!(err, AnalysisError::HostCommand(_)));
        assert_eq!(err.to_string(), "Fetching 9zzz failed");
    }

    #[test]
    fn test_messages() {
        let err = AnalysisError::PositionNotFound("P68871, /A@58".into());
        assert_eq!(
            err.to_string(),
            "AA position not found in protein: P68871, /A@58"
        );
        let err = AnalysisError::ResidueTypeMismatch("P68871, @58".into());
        assert_eq!(
            err.to_string(),
            "N/Q not found in this AA or the preceding one: P68871, @58"
        );
    }
}
