//! Retry policy for host calls

use amide_host::HostResult;

use crate::error::AnalysisResult;

/// Run a host call, repeating it once after a communication failure
///
/// Command errors reported by the host are returned immediately. A second
/// communication failure becomes [`AnalysisError::HostCommunication`].
///
/// [`AnalysisError::HostCommunication`]: crate::error::AnalysisError::HostCommunication
pub fn retry_once<T, F>(what: &str, mut call: F) -> AnalysisResult<T>
where
    F: FnMut() -> HostResult<T>,
{
    match call() {
        Ok(value) => Ok(value),
        Err(e) if e.is_communication() => {
            log::warn!("Host call '{}' failed ({}), retrying once", what, e);
            Ok(call()?)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use amide_host::HostError;
    use std::time::Duration;

    #[test]
    fn test_recovers_after_one_failure() {
        let mut attempts = 0;
        let value = retry_once("select", || {
            attempts += 1;
            if attempts == 1 {
                Err(HostError::Closed)
            } else {
                Ok(7)
            }
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_second_failure_is_fatal() {
        let mut attempts = 0;
        let err = retry_once::<(), _>("select", || {
            attempts += 1;
            Err(HostError::Timeout(Duration::from_secs(1)))
        })
        .unwrap_err();
        assert!(matches!(err, AnalysisError::HostCommunication(_)));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_command_errors_are_not_retried() {
        let mut attempts = 0;
        let err = retry_once::<(), _>("open", || {
            attempts += 1;
            Err(HostError::command("no such file"))
        })
        .unwrap_err();
        assert!(matches!(err, AnalysisError::HostCommand(_)));
        assert_eq!(attempts, 1);
    }
}
