//! Shared fixtures for the integration tests

#![allow(dead_code)]

use resultwatch_core::application::{WatchCoordinator, WatchOptions};
use resultwatch_infra_memory::InMemoryResultService;
use std::sync::Arc;
use std::time::Duration;

pub const SESSION: &str = "session-1";

pub fn coordinator(service: &Arc<InMemoryResultService>) -> WatchCoordinator {
    WatchCoordinator::new(service.clone(), service.clone())
}

pub fn options(bucket_size: usize, parallelism: usize) -> WatchOptions {
    WatchOptions {
        bucket_size,
        parallelism,
        ..Default::default()
    }
}

/// Poll `condition` until it holds, panicking after five seconds
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let polling = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(5), polling).await.is_err() {
        panic!("timed out waiting for {}", what);
    }
}
