//! resultwatch SDK - wait for results of a task-processing session
//!
//! Wraps the watcher core behind a small async client and a blocking facade.
//!
//! # Example
//!
//! ```no_run
//! use resultwatch_sdk::{ResultWatcher, WatchConfig};
//! use resultwatch_infra_memory::InMemoryResultService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(InMemoryResultService::new());
//!     let watcher = ResultWatcher::from_service(service, WatchConfig::from_env()?);
//!
//!     // Resolves once every result reached COMPLETED
//!     watcher.wait_for_results("session-1", ["result-a", "result-b"]).await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::{BlockingResultWatcher, ResultWatcher};
pub use config::WatchConfig;
pub use error::{Result, SdkError};

pub use resultwatch_core::application::{
    cancel_channel, CancelSource, CancelToken, EventHandler, WatchHandle,
};
pub use resultwatch_core::domain::{EventKind, ResultId, ResultStatus, StatusEvent, WatchOutcome};
pub use resultwatch_core::WatchError;
