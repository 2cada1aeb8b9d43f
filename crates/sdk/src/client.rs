//! Result Watcher Implementation

use crate::config::WatchConfig;
use crate::error::{Result, SdkError};
use resultwatch_core::application::{
    listen, CancelToken, EventHandler, WatchCoordinator, WatchHandle, WatchOptions,
};
use resultwatch_core::domain::{EventKind, ResultId, WatchOutcome};
use resultwatch_core::port::{EventFeed, ResultStatusProbe, SubscriptionRequest};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Waits for results of a session to reach a terminal status
///
/// Cheap to clone; clones share the feed and probe.
///
/// # Example
///
/// ```no_run
/// use resultwatch_sdk::{ResultWatcher, WatchConfig};
/// # use resultwatch_core::port::{EventFeed, ResultStatusProbe};
/// # use std::sync::Arc;
///
/// # async fn example(
/// #     feed: Arc<dyn EventFeed>,
/// #     probe: Arc<dyn ResultStatusProbe>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let watcher = ResultWatcher::new(feed, probe, WatchConfig::default().with_parallelism(4));
/// watcher.wait_for_results("session-1", ["result-a", "result-b"]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResultWatcher {
    coordinator: WatchCoordinator,
    feed: Arc<dyn EventFeed>,
    options: WatchOptions,
}

impl ResultWatcher {
    pub fn new(
        feed: Arc<dyn EventFeed>,
        probe: Arc<dyn ResultStatusProbe>,
        config: WatchConfig,
    ) -> Self {
        Self {
            coordinator: WatchCoordinator::new(Arc::clone(&feed), probe),
            feed,
            options: config.to_options(),
        }
    }

    /// Build from a single service implementing both ports
    pub fn from_service<S>(service: Arc<S>, config: WatchConfig) -> Self
    where
        S: EventFeed + ResultStatusProbe + 'static,
    {
        Self::new(service.clone(), service, config)
    }

    /// Wait until every result completed
    ///
    /// # Errors
    /// - SdkError::Watch(ResultAborted) naming the first aborted result
    /// - SdkError::Watch(TimedOut) if the configured deadline elapsed
    /// - SdkError::Watch(InvalidArgument) on a zero bucket size or parallelism
    pub async fn wait_for_results<I, T>(&self, session_id: &str, result_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        self.watch(session_id, result_ids, CancelToken::never())
            .await?
            .into_result()?;
        Ok(())
    }

    /// Wait until a single result completed
    pub async fn wait_for_result(
        &self,
        session_id: &str,
        result_id: impl Into<ResultId>,
    ) -> Result<()> {
        self.wait_for_results(session_id, [result_id.into()]).await
    }

    /// Watch until completion, abort, cancellation or deadline
    ///
    /// Unlike `wait_for_results`, stop conditions come back as a
    /// [`WatchOutcome`] rather than an error.
    pub async fn watch<I, T>(
        &self,
        session_id: &str,
        result_ids: I,
        cancel: CancelToken,
    ) -> Result<WatchOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        Ok(self
            .coordinator
            .watch(session_id, result_ids, &self.options, cancel)
            .await?)
    }

    /// Start a watch in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<I, T>(&self, session_id: &str, result_ids: I) -> Result<WatchHandle>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        Ok(self
            .coordinator
            .spawn(session_id, result_ids, self.options.clone())?)
    }

    /// Dispatch one raw subscription to `handlers`
    ///
    /// Empty `event_kinds` or `result_ids` leave that axis unfiltered.
    ///
    /// # Returns
    /// Number of events dispatched before a handler stopped the stream or the
    /// stream ended
    pub async fn listen(
        &self,
        session_id: &str,
        event_kinds: Vec<EventKind>,
        result_ids: Vec<ResultId>,
        handlers: &mut [EventHandler],
        cancel: CancelToken,
    ) -> Result<usize> {
        let request = SubscriptionRequest {
            session_id: session_id.to_string(),
            result_ids,
            event_kinds,
        };
        Ok(listen(self.feed.as_ref(), request, handlers, cancel).await?)
    }
}

/// Blocking facade over [`ResultWatcher`]
///
/// Owns a multi-thread tokio runtime. Must not be used (or dropped) from
/// within an asynchronous execution context.
pub struct BlockingResultWatcher {
    inner: ResultWatcher,
    runtime: Runtime,
}

impl BlockingResultWatcher {
    pub fn new(
        feed: Arc<dyn EventFeed>,
        probe: Arc<dyn ResultStatusProbe>,
        config: WatchConfig,
    ) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("resultwatch")
            .build()
            .map_err(|e| SdkError::Runtime(format!("Failed to start runtime: {}", e)))?;

        Ok(Self {
            inner: ResultWatcher::new(feed, probe, config),
            runtime,
        })
    }

    pub fn wait_for_results<I, T>(&self, session_id: &str, result_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        self.runtime
            .block_on(self.inner.wait_for_results(session_id, result_ids))
    }

    pub fn wait_for_result(&self, session_id: &str, result_id: impl Into<ResultId>) -> Result<()> {
        self.runtime
            .block_on(self.inner.wait_for_result(session_id, result_id))
    }

    pub fn watch<I, T>(
        &self,
        session_id: &str,
        result_ids: I,
        cancel: CancelToken,
    ) -> Result<WatchOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        self.runtime
            .block_on(self.inner.watch(session_id, result_ids, cancel))
    }

    /// Start a watch on the owned runtime
    ///
    /// Resolve it with [`WatchHandle::blocking_outcome`].
    pub fn spawn<I, T>(&self, session_id: &str, result_ids: I) -> Result<WatchHandle>
    where
        I: IntoIterator<Item = T>,
        T: Into<ResultId>,
    {
        let _guard = self.runtime.enter();
        self.inner.spawn(session_id, result_ids)
    }
}
