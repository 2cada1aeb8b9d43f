//! SDK Error Types

use resultwatch_core::WatchError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SdkError {
    /// The aborted result, if the watch failed because one was aborted
    pub fn aborted_result(&self) -> Option<&str> {
        match self {
            SdkError::Watch(WatchError::ResultAborted { result_id, .. }) => {
                Some(result_id.as_str())
            }
            _ => None,
        }
    }
}
