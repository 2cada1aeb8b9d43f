// Result & Task Domain Model

use serde::{Deserialize, Serialize};

/// Result ID (opaque, owned by the remote service, unique within a session)
pub type ResultId = String;

/// Session ID
pub type SessionId = String;

/// Task ID
pub type TaskId = String;

/// Result Status
///
/// Numeric codes follow the remote service; unknown codes decode to
/// `Unspecified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    #[default]
    Unspecified,
    Created,
    Completed,
    Aborted,
    /// Completed, but the data has been deleted from object storage
    Deleted,
    NotFound,
}

impl ResultStatus {
    /// Terminal for the watcher: no further transition is awaited
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResultStatus::Completed | ResultStatus::Aborted)
    }
}

impl From<i32> for ResultStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Created,
            2 => Self::Completed,
            3 => Self::Aborted,
            4 => Self::Deleted,
            127 => Self::NotFound,
            _ => Self::Unspecified,
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Unspecified => write!(f, "UNSPECIFIED"),
            ResultStatus::Created => write!(f, "CREATED"),
            ResultStatus::Completed => write!(f, "COMPLETED"),
            ResultStatus::Aborted => write!(f, "ABORTED"),
            ResultStatus::Deleted => write!(f, "DELETED"),
            ResultStatus::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// Task Status (carried by task events, never interpreted by the watcher)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Unspecified,
    Creating,
    Submitted,
    Dispatched,
    Completed,
    Error,
    Timeout,
    Cancelling,
    Cancelled,
    Processing,
    Processed,
    Retried,
}

impl From<i32> for TaskStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Creating,
            2 => Self::Submitted,
            3 => Self::Dispatched,
            4 => Self::Completed,
            5 => Self::Error,
            6 => Self::Timeout,
            7 => Self::Cancelling,
            8 => Self::Cancelled,
            9 => Self::Processing,
            10 => Self::Processed,
            11 => Self::Retried,
            _ => Self::Unspecified,
        }
    }
}
