// In-Memory Result Service
// Status table + event broadcast, standing in for the remote result service

use crate::filter::EventFilter;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use resultwatch_core::domain::{ResultId, ResultStatus, SessionId, StatusEvent};
use resultwatch_core::port::{
    EventFeed, EventStream, FeedError, ResultStatusProbe, SubscriptionRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct State {
    statuses: HashMap<(SessionId, ResultId), ResultStatus>,
    requests: Vec<SubscriptionRequest>,
    /// Streams end after delivering this many events
    stream_lifetime: Option<usize>,
    /// Subscribe calls still to fail with a transport error
    failing_subscriptions: usize,
    /// Filters naming more results than this are rejected
    max_filter_size: Option<usize>,
}

/// In-process result service
///
/// Status changes go to a shared table and are broadcast to every open
/// subscription whose filter matches. A new subscription only sees events
/// published after it was opened; earlier transitions are only visible
/// through `current_statuses`.
///
/// Cloning shares the same service.
#[derive(Clone)]
pub struct InMemoryResultService {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<(SessionId, StatusEvent)>,
}

impl InMemoryResultService {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            events,
        }
    }

    /// End every stream opened from now on after `events` deliveries
    pub fn with_stream_lifetime(self, events: usize) -> Self {
        self.lock().stream_lifetime = Some(events);
        self
    }

    /// Reject subscriptions filtering on more than `max` results
    pub fn with_max_filter_size(self, max: usize) -> Self {
        self.lock().max_filter_size = Some(max);
        self
    }

    /// Fail the next `count` subscribe calls with a transport error
    pub fn fail_next_subscriptions(&self, count: usize) {
        self.lock().failing_subscriptions = count;
    }

    /// Register a new result in `Created` and announce it
    pub fn create_result(&self, session_id: &str, result_id: &str, owner_id: &str) {
        self.lock().statuses.insert(
            (session_id.to_string(), result_id.to_string()),
            ResultStatus::Created,
        );
        self.publish(
            session_id,
            StatusEvent::NewResult {
                result_id: result_id.to_string(),
                owner_id: owner_id.to_string(),
                status: ResultStatus::Created,
            },
        );
    }

    /// Record a status transition and broadcast it
    pub fn set_status(&self, session_id: &str, result_id: &str, status: ResultStatus) {
        self.lock()
            .statuses
            .insert((session_id.to_string(), result_id.to_string()), status);
        self.publish(session_id, StatusEvent::result_update(result_id, status));
    }

    /// Hand a result over to another task
    pub fn set_owner(&self, session_id: &str, result_id: &str, previous: &str, current: &str) {
        self.publish(
            session_id,
            StatusEvent::ResultOwnerUpdate {
                result_id: result_id.to_string(),
                previous_owner_id: previous.to_string(),
                current_owner_id: current.to_string(),
            },
        );
    }

    /// Broadcast an arbitrary event without touching the status table
    pub fn publish(&self, session_id: &str, event: StatusEvent) {
        // No receiver is not an error: nobody is subscribed yet
        let receivers = self
            .events
            .send((session_id.to_string(), event))
            .unwrap_or(0);
        debug!(session_id = %session_id, receivers, "Event published");
    }

    pub fn status(&self, session_id: &str, result_id: &str) -> Option<ResultStatus> {
        self.lock()
            .statuses
            .get(&(session_id.to_string(), result_id.to_string()))
            .copied()
    }

    /// Every subscription request received so far, including failed ones
    pub fn subscriptions(&self) -> Vec<SubscriptionRequest> {
        self.lock().requests.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Subscriptions currently attached to the broadcast
    pub fn open_streams(&self) -> usize {
        self.events.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryResultService {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-subscription stream state
struct Subscription {
    rx: broadcast::Receiver<(SessionId, StatusEvent)>,
    filter: EventFilter,
    remaining: Option<usize>,
    finished: bool,
}

impl Subscription {
    async fn next(mut self) -> Option<(Result<StatusEvent, FeedError>, Self)> {
        if self.finished || self.remaining == Some(0) {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Ok((session_id, event)) => {
                    if !self.filter.matches(&session_id, &event) {
                        continue;
                    }
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some((Ok(event), self));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind the event broadcast");
                    self.finished = true;
                    let err =
                        FeedError::Transport(format!("subscriber lagged by {} events", skipped));
                    return Some((Err(err), self));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
impl EventFeed for InMemoryResultService {
    async fn subscribe(&self, request: SubscriptionRequest) -> Result<EventStream, FeedError> {
        let filter = EventFilter::from(&request);
        let stream_lifetime = {
            let mut state = self.lock();
            state.requests.push(request);

            if state.failing_subscriptions > 0 {
                state.failing_subscriptions -= 1;
                return Err(FeedError::Transport("connection refused".to_string()));
            }
            if let Some(max) = state.max_filter_size {
                if filter.result_id_count() > max {
                    return Err(FeedError::Rejected(format!(
                        "filter names {} results, at most {} allowed",
                        filter.result_id_count(),
                        max
                    )));
                }
            }
            state.stream_lifetime
        };

        // Attach before returning so nothing published afterwards is missed
        let subscription = Subscription {
            rx: self.events.subscribe(),
            filter,
            remaining: stream_lifetime,
            finished: false,
        };
        Ok(stream::unfold(subscription, Subscription::next).boxed())
    }
}

#[async_trait]
impl ResultStatusProbe for InMemoryResultService {
    async fn current_statuses(
        &self,
        session_id: &str,
        result_ids: &[ResultId],
    ) -> Result<Vec<(ResultId, ResultStatus)>, FeedError> {
        let state = self.lock();
        Ok(result_ids
            .iter()
            .filter_map(|id| {
                state
                    .statuses
                    .get(&(session_id.to_string(), id.clone()))
                    .map(|status| (id.clone(), *status))
            })
            .collect())
    }
}
