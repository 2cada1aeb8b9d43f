// resultwatch Core - Domain, Ports & the result-completion watcher
// NO transport dependencies: the event feed is reached only through ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{Result, WatchError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
