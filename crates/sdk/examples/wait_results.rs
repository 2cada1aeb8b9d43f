//! Wait Results Example
//!
//! Simulates a session on the in-memory result service: a background
//! producer completes results one by one while the watcher waits for all of
//! them. The service ends every subscription after a few events, so the
//! watcher has to resubscribe along the way.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=resultwatch=debug cargo run --example wait_results
//! RESULTWATCH_LOG_FORMAT=json RESULTWATCH_PARALLELISM=2 cargo run --example wait_results
//! ```

use anyhow::Result;
use resultwatch_infra_memory::InMemoryResultService;
use resultwatch_sdk::{ResultStatus, ResultWatcher, WatchConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SESSION: &str = "session-demo";

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("RESULTWATCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("resultwatch=info,wait_results=info"))?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = WatchConfig::from_env()?.with_bucket_size(4);
    let service = Arc::new(InMemoryResultService::new().with_stream_lifetime(3));
    let result_ids: Vec<String> = (0..10).map(|i| format!("result-{}", i)).collect();

    for id in &result_ids {
        service.create_result(SESSION, id, "task-0");
    }

    let producer = {
        let service = Arc::clone(&service);
        let result_ids = result_ids.clone();
        tokio::spawn(async move {
            for id in &result_ids {
                tokio::time::sleep(Duration::from_millis(50)).await;
                service.set_status(SESSION, id, ResultStatus::Completed);
            }
        })
    };

    info!(
        results = result_ids.len(),
        bucket_size = config.bucket_size,
        parallelism = config.parallelism,
        "Waiting for results"
    );

    let watcher = ResultWatcher::from_service(Arc::clone(&service), config);
    watcher.wait_for_results(SESSION, result_ids).await?;
    producer.await?;

    info!(
        subscriptions = service.subscription_count(),
        "All results completed"
    );
    Ok(())
}
