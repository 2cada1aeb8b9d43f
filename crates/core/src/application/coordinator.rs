//! Watcher Coordinator - fans chunks out to completion trackers and folds
//! their outcomes back into one
//!
//! - At most `parallelism` trackers run at once; further chunks wait in FIFO
//!   order for a free slot
//! - Fail-fast: the first aborted chunk cancels every sibling
//! - Caller cancellation and the optional deadline stop every tracker and
//!   resolve to `Cancelled` / `TimedOut`

use crate::application::cancel::{cancel_channel, CancelSource, CancelToken};
use crate::application::constants::{DEFAULT_BUCKET_SIZE, DEFAULT_PARALLELISM};
use crate::application::partition::partition;
use crate::application::tracker::CompletionTracker;
use crate::domain::{ChunkOutcome, ResultId, WatchOutcome};
use crate::error::{Result, WatchError};
use crate::port::{EventFeed, ResultStatusProbe};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, Instrument};

/// Tuning of one watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Maximum number of results per subscription
    pub bucket_size: usize,
    /// Maximum number of chunks watched at the same time
    pub parallelism: usize,
    /// Overall deadline (None = wait forever)
    pub deadline: Option<Duration>,
    /// Consecutive lost subscriptions tolerated per chunk (None = unbounded)
    pub max_resubscriptions: Option<u32>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            deadline: None,
            max_resubscriptions: None,
        }
    }
}

impl WatchOptions {
    pub fn validate(&self) -> Result<()> {
        if self.bucket_size == 0 {
            return Err(WatchError::InvalidArgument(
                "bucket_size must be positive".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(WatchError::InvalidArgument(
                "parallelism must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Coordinates completion trackers for whole watches
#[derive(Clone)]
pub struct WatchCoordinator {
    feed: Arc<dyn EventFeed>,
    probe: Arc<dyn ResultStatusProbe>,
}

impl WatchCoordinator {
    pub fn new(feed: Arc<dyn EventFeed>, probe: Arc<dyn ResultStatusProbe>) -> Self {
        Self { feed, probe }
    }

    /// Wait until every result completed, one aborted, or the watch is stopped
    ///
    /// # Errors
    /// - WatchError::InvalidArgument on zero `bucket_size`/`parallelism`
    ///   (before any subscription) or when the feed rejects a filter
    /// - WatchError::ResubscribeLimit if `max_resubscriptions` is exhausted
    /// - WatchError::Internal if a tracker task panicked
    pub async fn watch<I, T>(
        &self,
        session_id: &str,
        result_ids: I,
        options: &WatchOptions,
        cancel: CancelToken,
    ) -> Result<WatchOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        options.validate()?;
        let chunks = partition(result_ids, options.bucket_size)?;
        if chunks.is_empty() {
            debug!(session_id = %session_id, "Nothing to watch");
            return Ok(WatchOutcome::Completed);
        }

        let watch_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("watch", watch_id = %watch_id, session_id = %session_id);
        self.run_chunks(session_id, chunks, options, cancel)
            .instrument(span)
            .await
    }

    /// Start a watch in the background and return a cancellable handle
    ///
    /// Arguments are validated before anything is spawned. Must be called
    /// from within a tokio runtime.
    pub fn spawn<I, T>(
        &self,
        session_id: &str,
        result_ids: I,
        options: WatchOptions,
    ) -> Result<WatchHandle>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        options.validate()?;
        let result_ids: Vec<ResultId> = result_ids.into_iter().map(Into::into).collect();
        let session_id = session_id.to_string();
        let coordinator = self.clone();
        let (cancel, token) = cancel_channel();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = coordinator
                .watch(&session_id, result_ids, &options, token)
                .await;
            let _ = tx.send(outcome);
        });

        Ok(WatchHandle {
            cancel: CancelOnDrop(cancel),
            rx,
        })
    }

    async fn run_chunks(
        &self,
        session_id: &str,
        chunks: Vec<Vec<ResultId>>,
        options: &WatchOptions,
        cancel: CancelToken,
    ) -> Result<WatchOutcome> {
        let total = chunks.len();
        // A deadline past the clock's range is no deadline at all
        let deadline = options.deadline.and_then(|d| Instant::now().checked_add(d));
        let mut queued: VecDeque<(usize, Vec<ResultId>)> =
            chunks.into_iter().enumerate().collect();
        let mut running: JoinSet<Result<ChunkOutcome>> = JoinSet::new();
        let (stop, stop_token) = cancel_channel();
        let mut completed = 0usize;

        info!(
            chunks = total,
            parallelism = options.parallelism,
            "Watching results"
        );

        let result = loop {
            while running.len() < options.parallelism {
                let Some((index, chunk)) = queued.pop_front() else {
                    break;
                };
                let tracker = CompletionTracker::new(
                    session_id,
                    index,
                    chunk,
                    Arc::clone(&self.feed),
                    Arc::clone(&self.probe),
                    options.max_resubscriptions,
                );
                running.spawn(tracker.run(stop_token.clone()).in_current_span());
            }

            if running.is_empty() {
                break Ok(WatchOutcome::Completed);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(WatchOutcome::Cancelled),
                _ = deadline_elapsed(deadline) => break Ok(WatchOutcome::TimedOut),
                Some(joined) = running.join_next() => match tracker_exit(joined) {
                    None => {
                        completed += 1;
                        debug!(completed, total, "Chunk done");
                    }
                    Some(result) => break result,
                },
            }
        };

        shutdown(stop, &mut running).await;

        match &result {
            Ok(outcome) => info!(outcome = %outcome, completed, total, "Watch finished"),
            Err(e) => info!(error = %e, completed, total, "Watch failed"),
        }
        result
    }
}

/// Fold one finished tracker into the watch; `None` means its chunk completed
fn tracker_exit(
    joined: std::result::Result<Result<ChunkOutcome>, JoinError>,
) -> Option<Result<WatchOutcome>> {
    match joined {
        Ok(Ok(ChunkOutcome::Completed)) => None,
        Ok(Ok(aborted)) => Some(Ok(aborted.into())),
        // Only the stop token cancels trackers, and it fires after the loop
        Ok(Err(WatchError::Cancelled)) => {
            error!("Tracker cancelled while the watch was still running");
            Some(Err(WatchError::Internal(
                "tracker cancelled before the watch ended".to_string(),
            )))
        }
        Ok(Err(e)) => Some(Err(e)),
        Err(join_err) => {
            error!(error = %join_err, "Tracker task failed");
            Some(Err(WatchError::Internal(format!(
                "tracker task failed: {}",
                join_err
            ))))
        }
    }
}

/// Signal every tracker still running and wait for them to unwind
async fn shutdown(stop: CancelSource, running: &mut JoinSet<Result<ChunkOutcome>>) {
    if running.is_empty() {
        return;
    }
    stop.cancel();
    while running.join_next().await.is_some() {}
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle on a watch running in the background
///
/// Dropping the handle cancels the watch and releases its subscriptions.
pub struct WatchHandle {
    cancel: CancelOnDrop,
    rx: oneshot::Receiver<Result<WatchOutcome>>,
}

/// Cancels the watch once the handle goes away
struct CancelOnDrop(CancelSource);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl WatchHandle {
    /// Request cancellation; the outcome then resolves to `Cancelled`
    pub fn cancel(&self) {
        self.cancel.0.cancel();
    }

    /// Cancellation source usable from other tasks or threads
    pub fn canceller(&self) -> CancelSource {
        self.cancel.0.clone()
    }

    /// Wait for the aggregate outcome
    pub async fn outcome(self) -> Result<WatchOutcome> {
        self.rx.await.unwrap_or_else(|_| Err(lost_outcome()))
    }

    /// Block the current thread until the aggregate outcome is known
    ///
    /// # Panics
    /// When called from within an asynchronous execution context.
    pub fn blocking_outcome(self) -> Result<WatchOutcome> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(lost_outcome()))
    }
}

fn lost_outcome() -> WatchError {
    WatchError::Internal("watch task ended without an outcome".to_string())
}
