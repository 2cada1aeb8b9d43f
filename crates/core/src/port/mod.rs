// Port Layer - Interfaces for external collaborators

pub mod event_feed;
pub mod status_probe;

// Re-exports
pub use event_feed::{EventFeed, EventStream, FeedError, SubscriptionRequest};
pub use status_probe::ResultStatusProbe;
