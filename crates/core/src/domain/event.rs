// Status Event Domain Model

use super::result::{ResultId, ResultStatus, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Kinds of events a subscription can ask for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Unspecified,
    NewTask,
    TaskStatusUpdate,
    NewResult,
    ResultStatusUpdate,
    ResultOwnerUpdate,
}

impl From<i32> for EventKind {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::NewTask,
            2 => Self::TaskStatusUpdate,
            3 => Self::NewResult,
            4 => Self::ResultStatusUpdate,
            5 => Self::ResultOwnerUpdate,
            _ => Self::Unspecified,
        }
    }
}

/// One notification delivered by the event feed
///
/// Only `ResultStatusUpdate` and `NewResult` matter to the watcher. Variants
/// the feed may add later decode to `Unknown` instead of failing the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEvent {
    ResultStatusUpdate {
        result_id: ResultId,
        status: ResultStatus,
    },
    NewResult {
        result_id: ResultId,
        #[serde(default)]
        owner_id: TaskId,
        status: ResultStatus,
    },
    TaskStatusUpdate {
        task_id: TaskId,
        status: TaskStatus,
    },
    ResultOwnerUpdate {
        result_id: ResultId,
        previous_owner_id: TaskId,
        current_owner_id: TaskId,
    },
    NewTask {
        task_id: TaskId,
        payload_id: ResultId,
        #[serde(default)]
        origin_task_id: TaskId,
        status: TaskStatus,
        #[serde(default)]
        expected_output_keys: Vec<ResultId>,
        #[serde(default)]
        data_dependencies: Vec<ResultId>,
        #[serde(default)]
        retry_of_ids: Vec<TaskId>,
        #[serde(default)]
        parent_task_ids: Vec<TaskId>,
    },
    #[serde(other)]
    Unknown,
}

impl StatusEvent {
    /// Shorthand for a result status update
    pub fn result_update(result_id: impl Into<ResultId>, status: ResultStatus) -> Self {
        StatusEvent::ResultStatusUpdate {
            result_id: result_id.into(),
            status,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            StatusEvent::ResultStatusUpdate { .. } => EventKind::ResultStatusUpdate,
            StatusEvent::NewResult { .. } => EventKind::NewResult,
            StatusEvent::TaskStatusUpdate { .. } => EventKind::TaskStatusUpdate,
            StatusEvent::ResultOwnerUpdate { .. } => EventKind::ResultOwnerUpdate,
            StatusEvent::NewTask { .. } => EventKind::NewTask,
            StatusEvent::Unknown => EventKind::Unspecified,
        }
    }

    /// Result identifier and status, for the two variants that carry both
    pub fn result_status(&self) -> Option<(&ResultId, ResultStatus)> {
        match self {
            StatusEvent::ResultStatusUpdate { result_id, status }
            | StatusEvent::NewResult {
                result_id, status, ..
            } => Some((result_id, *status)),
            _ => None,
        }
    }

    /// Result the event is about, if any
    pub fn result_id(&self) -> Option<&ResultId> {
        match self {
            StatusEvent::ResultStatusUpdate { result_id, .. }
            | StatusEvent::NewResult { result_id, .. }
            | StatusEvent::ResultOwnerUpdate { result_id, .. } => Some(result_id),
            _ => None,
        }
    }
}
