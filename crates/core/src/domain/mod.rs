// Domain Layer - Result/task identities, statuses, events and watch outcomes

pub mod event;
pub mod outcome;
pub mod result;

// Re-exports
pub use event::{EventKind, StatusEvent};
pub use outcome::{ChunkOutcome, WatchOutcome};
pub use result::{ResultId, ResultStatus, SessionId, TaskId, TaskStatus};
