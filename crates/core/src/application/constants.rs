// Watcher constants (no magic values)
use crate::domain::EventKind;

/// Default number of results per subscription filter
pub const DEFAULT_BUCKET_SIZE: usize = 100;

/// Default number of chunks watched at the same time
pub const DEFAULT_PARALLELISM: usize = 1;

/// Event kinds a completion tracker subscribes to
pub const WATCHED_EVENT_KINDS: [EventKind; 2] =
    [EventKind::ResultStatusUpdate, EventKind::NewResult];
