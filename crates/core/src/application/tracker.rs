//! Completion Tracker - drives one chunk's pending set to empty
//!
//! State machine:
//! - Subscribing: open a subscription on the *current* pending set, then catch
//!   up once through the status probe
//! - Receiving: consume events until Done, Failed or the stream ends
//! - Resubscribing: the stream ended (or broke) with results still pending
//! - Done / Failed: terminal, reported as a `ChunkOutcome`

use crate::application::cancel::CancelToken;
use crate::application::constants::WATCHED_EVENT_KINDS;
use crate::domain::{ChunkOutcome, ResultId, ResultStatus, SessionId, StatusEvent};
use crate::error::{Result, WatchError};
use crate::port::{EventFeed, EventStream, FeedError, ResultStatusProbe, SubscriptionRequest};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

enum TrackerState {
    Subscribing,
    Receiving(EventStream),
    Resubscribing,
    Done,
    Failed { result_id: ResultId, cause: String },
}

/// Tracker for one chunk of results
pub struct CompletionTracker {
    session_id: SessionId,
    chunk: usize,
    pending: HashSet<ResultId>,
    feed: Arc<dyn EventFeed>,
    probe: Arc<dyn ResultStatusProbe>,
    max_resubscriptions: Option<u32>,
    /// Subscriptions lost in a row without any result resolving
    lost_streak: u32,
}

impl CompletionTracker {
    /// Create a tracker for one chunk
    ///
    /// # Arguments
    /// * `chunk` - Chunk index, only used for logging
    /// * `max_resubscriptions` - Give up after this many consecutive lost
    ///   subscriptions without progress (`None` = never give up)
    pub fn new(
        session_id: impl Into<SessionId>,
        chunk: usize,
        result_ids: Vec<ResultId>,
        feed: Arc<dyn EventFeed>,
        probe: Arc<dyn ResultStatusProbe>,
        max_resubscriptions: Option<u32>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            chunk,
            pending: result_ids.into_iter().collect(),
            feed,
            probe,
            max_resubscriptions,
            lost_streak: 0,
        }
    }

    /// Number of results not yet observed as COMPLETED
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Run until every result completed or one aborted
    ///
    /// # Errors
    /// - WatchError::Cancelled if `cancel` fires first (no outcome is produced)
    /// - WatchError::InvalidArgument if the feed rejects the subscription
    /// - WatchError::ResubscribeLimit if the resubscription bound is exhausted
    pub async fn run(mut self, cancel: CancelToken) -> Result<ChunkOutcome> {
        let mut state = if self.pending.is_empty() {
            TrackerState::Done
        } else {
            TrackerState::Subscribing
        };

        loop {
            state = match state {
                TrackerState::Subscribing => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(WatchError::Cancelled),
                        next = self.subscribe() => next?,
                    }
                }
                TrackerState::Receiving(mut stream) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(WatchError::Cancelled),
                        item = stream.next() => match item {
                            Some(Ok(event)) => self
                                .on_event(&event)
                                .unwrap_or(TrackerState::Receiving(stream)),
                            Some(Err(e)) => {
                                debug!(chunk = self.chunk, error = %e, "Event stream broke");
                                TrackerState::Resubscribing
                            }
                            None => {
                                debug!(
                                    chunk = self.chunk,
                                    pending = self.pending.len(),
                                    "Event stream ended"
                                );
                                TrackerState::Resubscribing
                            }
                        },
                    }
                }
                TrackerState::Resubscribing => {
                    if cancel.is_cancelled() {
                        return Err(WatchError::Cancelled);
                    }
                    self.lost_streak += 1;
                    if let Some(max) = self.max_resubscriptions {
                        if self.lost_streak > max {
                            warn!(
                                chunk = self.chunk,
                                attempts = self.lost_streak,
                                "Resubscription limit reached"
                            );
                            return Err(WatchError::ResubscribeLimit {
                                attempts: self.lost_streak,
                            });
                        }
                    }
                    debug!(
                        chunk = self.chunk,
                        pending = self.pending.len(),
                        attempt = self.lost_streak,
                        "Resubscribing"
                    );
                    TrackerState::Subscribing
                }
                TrackerState::Done => {
                    debug!(chunk = self.chunk, "Chunk completed");
                    return Ok(ChunkOutcome::Completed);
                }
                TrackerState::Failed { result_id, cause } => {
                    debug!(chunk = self.chunk, result_id = %result_id, "Chunk aborted");
                    return Ok(ChunkOutcome::Aborted { result_id, cause });
                }
            };
        }
    }

    /// Open a subscription on the pending set, then catch up on statuses that
    /// changed while no subscription was open
    async fn subscribe(&mut self) -> Result<TrackerState> {
        let request = SubscriptionRequest {
            session_id: self.session_id.clone(),
            result_ids: self.pending_ids(),
            event_kinds: WATCHED_EVENT_KINDS.to_vec(),
        };

        let stream = match self.feed.subscribe(request).await {
            Ok(stream) => stream,
            Err(e) => return self.on_feed_error(e),
        };

        let statuses = match self
            .probe
            .current_statuses(&self.session_id, &self.pending_ids())
            .await
        {
            Ok(statuses) => statuses,
            Err(e) => return self.on_feed_error(e),
        };
        for (result_id, status) in statuses {
            if let Some(next) = self.apply(&result_id, status) {
                return Ok(next);
            }
        }

        Ok(TrackerState::Receiving(stream))
    }

    fn on_feed_error(&self, error: FeedError) -> Result<TrackerState> {
        match error {
            FeedError::Rejected(msg) => Err(WatchError::InvalidArgument(msg)),
            FeedError::Transport(msg) => {
                warn!(chunk = self.chunk, error = %msg, "Subscription failed, will resubscribe");
                Ok(TrackerState::Resubscribing)
            }
        }
    }

    fn on_event(&mut self, event: &StatusEvent) -> Option<TrackerState> {
        let (result_id, status) = event.result_status()?;
        self.apply(result_id, status)
    }

    /// Apply one observed status; returns the next state if it is terminal
    fn apply(&mut self, result_id: &str, status: ResultStatus) -> Option<TrackerState> {
        if !status.is_terminal() || !self.pending.contains(result_id) {
            return None;
        }
        if status == ResultStatus::Aborted {
            return Some(TrackerState::Failed {
                result_id: result_id.to_string(),
                cause: format!("Result {} has been aborted", result_id),
            });
        }
        self.pending.remove(result_id);
        self.lost_streak = 0;
        debug!(
            chunk = self.chunk,
            result_id = %result_id,
            pending = self.pending.len(),
            "Result completed"
        );
        self.pending.is_empty().then_some(TrackerState::Done)
    }

    fn pending_ids(&self) -> Vec<ResultId> {
        let mut ids: Vec<ResultId> = self.pending.iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::domain::{EventKind, TaskStatus};
    use crate::port::event_feed::mocks::ScriptedEventFeed;
    use crate::port::status_probe::mocks::StaticStatusProbe;
    use crate::port::status_probe::MockResultStatusProbe;
    use std::time::Duration;

    fn ids(list: &[&str]) -> Vec<ResultId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tracker(
        list: &[&str],
        feed: &ScriptedEventFeed,
        probe: Arc<dyn ResultStatusProbe>,
    ) -> CompletionTracker {
        CompletionTracker::new(
            "session",
            0,
            ids(list),
            Arc::new(feed.clone()),
            probe,
            None,
        )
    }

    /// Tracker whose catch-up probe knows no results
    fn feed_tracker(list: &[&str], feed: &ScriptedEventFeed) -> CompletionTracker {
        tracker(list, feed, Arc::new(StaticStatusProbe::new()))
    }

    async fn run_with_timeout(tracker: CompletionTracker) -> Result<ChunkOutcome> {
        tokio::time::timeout(Duration::from_secs(2), tracker.run(CancelToken::never()))
            .await
            .expect("tracker should finish")
    }

    #[tokio::test]
    async fn test_completes_on_single_subscription() {
        let feed = ScriptedEventFeed::new();
        feed.push_hanging(vec![
            StatusEvent::result_update("A", ResultStatus::Created),
            StatusEvent::result_update("A", ResultStatus::Completed),
            StatusEvent::NewResult {
                result_id: "B".to_string(),
                owner_id: "t1".to_string(),
                status: ResultStatus::Completed,
            },
        ]);

        let outcome = run_with_timeout(feed_tracker(&["A", "B"], &feed)).await;

        assert_eq!(outcome, Ok(ChunkOutcome::Completed));
        assert_eq!(feed.subscribe_count(), 1);
        let request = &feed.requests()[0];
        assert_eq!(request.session_id, "session");
        assert_eq!(request.result_ids, ids(&["A", "B"]));
        assert_eq!(
            request.event_kinds,
            vec![EventKind::ResultStatusUpdate, EventKind::NewResult]
        );
    }

    #[tokio::test]
    async fn test_resubscribes_with_remaining_results_only() {
        let feed = ScriptedEventFeed::new();
        feed.push_closing(vec![StatusEvent::result_update("A", ResultStatus::Completed)]);
        feed.push_hanging(vec![StatusEvent::result_update("B", ResultStatus::Completed)]);

        let outcome = run_with_timeout(feed_tracker(&["A", "B"], &feed)).await;

        assert_eq!(outcome, Ok(ChunkOutcome::Completed));
        let requests = feed.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].result_ids, ids(&["B"]));
    }

    #[tokio::test]
    async fn test_stream_and_subscribe_errors_are_retried() {
        let feed = ScriptedEventFeed::new();
        feed.push_refused(FeedError::Transport("connection reset".to_string()));
        feed.push_broken(
            vec![StatusEvent::result_update("A", ResultStatus::Completed)],
            FeedError::Transport("stream reset".to_string()),
        );
        feed.push_hanging(vec![StatusEvent::result_update("B", ResultStatus::Completed)]);

        let outcome = run_with_timeout(feed_tracker(&["A", "B"], &feed)).await;

        assert_eq!(outcome, Ok(ChunkOutcome::Completed));
        assert_eq!(feed.subscribe_count(), 3);
    }

    #[tokio::test]
    async fn test_abort_fails_immediately() {
        let feed = ScriptedEventFeed::new();
        feed.push_hanging(vec![StatusEvent::result_update("B", ResultStatus::Aborted)]);

        let outcome = run_with_timeout(feed_tracker(&["A", "B"], &feed)).await;

        match outcome {
            Ok(ChunkOutcome::Aborted { result_id, cause }) => {
                assert_eq!(result_id, "B");
                assert!(cause.contains("aborted"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_foreign_and_unrelated_events_ignored() {
        let feed = ScriptedEventFeed::new();
        feed.push_hanging(vec![
            StatusEvent::result_update("other-chunk", ResultStatus::Aborted),
            StatusEvent::TaskStatusUpdate {
                task_id: "t1".to_string(),
                status: TaskStatus::Error,
            },
            StatusEvent::Unknown,
            StatusEvent::result_update("A", ResultStatus::Completed),
            // Stale duplicate after A already resolved
            StatusEvent::result_update("A", ResultStatus::Aborted),
            StatusEvent::result_update("B", ResultStatus::Completed),
        ]);

        let outcome = run_with_timeout(feed_tracker(&["A", "B"], &feed)).await;
        assert_eq!(outcome, Ok(ChunkOutcome::Completed));
    }

    #[tokio::test]
    async fn test_catch_up_probe_resolves_missed_completion() {
        // B completes between the two subscriptions: the feed never reports it
        let feed = ScriptedEventFeed::new();
        feed.push_closing(vec![StatusEvent::result_update("A", ResultStatus::Completed)]);
        feed.push_hanging(vec![]);

        let mut probe = MockResultStatusProbe::new();
        let mut calls = 0;
        probe
            .expect_current_statuses()
            .times(2)
            .returning(move |_, result_ids| {
                calls += 1;
                if calls == 1 {
                    return Ok(vec![]);
                }
                Ok(result_ids
                    .iter()
                    .map(|id| (id.clone(), ResultStatus::Completed))
                    .collect())
            });

        let tracker = tracker(&["A", "B"], &feed, Arc::new(probe));
        let outcome = run_with_timeout(tracker).await;

        assert_eq!(outcome, Ok(ChunkOutcome::Completed));
        assert_eq!(feed.requests()[1].result_ids, ids(&["B"]));
    }

    #[tokio::test]
    async fn test_catch_up_probe_reports_abort() {
        let feed = ScriptedEventFeed::new();
        let mut probe = MockResultStatusProbe::new();
        probe
            .expect_current_statuses()
            .times(1)
            .returning(|_, _| Ok(vec![("A".to_string(), ResultStatus::Aborted)]));

        let tracker = tracker(&["A"], &feed, Arc::new(probe));
        let outcome = run_with_timeout(tracker).await;
        assert!(matches!(
            outcome,
            Ok(ChunkOutcome::Aborted { ref result_id, .. }) if result_id == "A"
        ));
    }

    #[tokio::test]
    async fn test_rejected_subscription_is_invalid_argument() {
        let feed = ScriptedEventFeed::new();
        feed.push_refused(FeedError::Rejected("filter too large".to_string()));

        let outcome = run_with_timeout(feed_tracker(&["A"], &feed)).await;
        assert_eq!(
            outcome,
            Err(WatchError::InvalidArgument("filter too large".to_string()))
        );
    }

    #[tokio::test]
    async fn test_resubscription_bound() {
        let feed = ScriptedEventFeed::new();
        for _ in 0..3 {
            feed.push_closing(vec![]);
        }
        let tracker = CompletionTracker::new(
            "session",
            0,
            ids(&["A"]),
            Arc::new(feed.clone()),
            Arc::new(StaticStatusProbe::new()),
            Some(2),
        );

        let outcome = run_with_timeout(tracker).await;
        assert_eq!(outcome, Err(WatchError::ResubscribeLimit { attempts: 3 }));
        assert_eq!(feed.subscribe_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_without_outcome() {
        let feed = ScriptedEventFeed::new();
        feed.push_hanging(vec![]);
        let (source, token) = cancel_channel();

        let tracker = feed_tracker(&["A"], &feed);
        let runner = tokio::spawn(tracker.run(token));
        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .expect("cancel should unblock the tracker")
            .unwrap();
        assert_eq!(outcome, Err(WatchError::Cancelled));
    }

    #[test]
    fn test_pending_set_only_shrinks() {
        let feed = ScriptedEventFeed::new();
        let mut tracker = feed_tracker(&["A", "B", "C"], &feed);
        let observed = [
            ("A", ResultStatus::Created),
            ("A", ResultStatus::Completed),
            ("A", ResultStatus::Completed),
            ("X", ResultStatus::Completed),
            ("B", ResultStatus::Deleted),
            ("C", ResultStatus::Completed),
        ];

        let mut last = tracker.pending_len();
        for (id, status) in observed {
            let _ = tracker.apply(id, status);
            assert!(tracker.pending_len() <= last);
            last = tracker.pending_len();
        }
        assert_eq!(tracker.pending_ids(), ids(&["B"]));
    }

    #[test]
    fn test_non_terminal_statuses_leave_pending_untouched() {
        let feed = ScriptedEventFeed::new();
        let mut tracker = feed_tracker(&["A"], &feed);
        for status in [
            ResultStatus::Unspecified,
            ResultStatus::Created,
            ResultStatus::Deleted,
            ResultStatus::NotFound,
        ] {
            assert!(tracker.apply("A", status).is_none());
        }
        assert_eq!(tracker.pending_ids(), ids(&["A"]));
        assert!(matches!(
            tracker.apply("A", ResultStatus::Completed),
            Some(TrackerState::Done)
        ));
    }
}
