// Watch Outcome Domain Model

use super::result::ResultId;
use crate::error::WatchError;

/// Outcome of one chunk's wait (produced exactly once per chunk that ran to the end)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Completed,
    Aborted { result_id: ResultId, cause: String },
}

/// Aggregate outcome of a whole watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Every watched result reached COMPLETED
    Completed,
    /// A watched result reached ABORTED; sibling chunks were cancelled
    Aborted { result_id: ResultId, cause: String },
    /// The caller stopped waiting
    Cancelled,
    /// The overall deadline expired
    TimedOut,
}

impl WatchOutcome {
    /// Convert into a `Result` so callers can use `?`
    pub fn into_result(self) -> crate::error::Result<()> {
        match self {
            WatchOutcome::Completed => Ok(()),
            WatchOutcome::Aborted { result_id, cause } => {
                Err(WatchError::ResultAborted { result_id, cause })
            }
            WatchOutcome::Cancelled => Err(WatchError::Cancelled),
            WatchOutcome::TimedOut => Err(WatchError::TimedOut),
        }
    }
}

impl From<ChunkOutcome> for WatchOutcome {
    fn from(outcome: ChunkOutcome) -> Self {
        match outcome {
            ChunkOutcome::Completed => WatchOutcome::Completed,
            ChunkOutcome::Aborted { result_id, cause } => {
                WatchOutcome::Aborted { result_id, cause }
            }
        }
    }
}

impl std::fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchOutcome::Completed => write!(f, "COMPLETED"),
            WatchOutcome::Aborted { result_id, .. } => write!(f, "ABORTED({})", result_id),
            WatchOutcome::Cancelled => write!(f, "CANCELLED"),
            WatchOutcome::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_keeps_failures_distinct() {
        assert!(WatchOutcome::Completed.into_result().is_ok());
        assert_eq!(
            WatchOutcome::Cancelled.into_result(),
            Err(WatchError::Cancelled)
        );
        assert_eq!(WatchOutcome::TimedOut.into_result(), Err(WatchError::TimedOut));

        let aborted = WatchOutcome::Aborted {
            result_id: "r9".to_string(),
            cause: "owner task failed".to_string(),
        };
        match aborted.into_result() {
            Err(WatchError::ResultAborted { result_id, .. }) => assert_eq!(result_id, "r9"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
