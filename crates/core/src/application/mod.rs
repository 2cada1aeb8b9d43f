// Application Layer - Watch use cases

pub mod cancel;
pub mod constants;
pub mod coordinator;
pub mod listen;
pub mod partition;
pub mod tracker;

// Re-exports
pub use cancel::{cancel_channel, CancelSource, CancelToken};
pub use coordinator::{WatchCoordinator, WatchHandle, WatchOptions};
pub use listen::{listen, EventHandler};
pub use partition::partition;
pub use tracker::CompletionTracker;
