// resultwatch Infrastructure - In-Memory Adapter
// Implements: EventFeed, ResultStatusProbe

mod filter;
mod service;

pub use filter::EventFilter;
pub use service::{InMemoryResultService, DEFAULT_EVENT_CAPACITY};
