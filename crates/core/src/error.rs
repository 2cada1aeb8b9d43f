// Central Error Type for the watcher

use crate::domain::ResultId;
use crate::port::FeedError;
use thiserror::Error;

/// Watch-level error type
///
/// Only `InvalidArgument`, `ResultAborted`, `Cancelled` and `TimedOut` are
/// expected from a watch in normal operation. Transport failures never leave a
/// watch: trackers recover from them by resubscribing. `Feed` is only returned
/// by the plain event listener, which does not resubscribe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Result {result_id} has been aborted: {cause}")]
    ResultAborted { result_id: ResultId, cause: String },

    #[error("Watch cancelled")]
    Cancelled,

    #[error("Watch deadline exceeded")]
    TimedOut,

    #[error("Subscription lost {attempts} times in a row, giving up")]
    ResubscribeLimit { attempts: u32 },

    #[error("Event feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using WatchError
pub type Result<T> = std::result::Result<T, WatchError>;
