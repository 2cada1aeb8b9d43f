// Event Feed Port (Interface)
// Server-streamed status notifications scoped to a session and a result filter

use crate::domain::{EventKind, ResultId, SessionId, StatusEvent};
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Live sequence of notifications for one subscription
///
/// The stream may end (or yield an error) at any time, whether or not every
/// filtered result has resolved.
pub type EventStream = BoxStream<'static, Result<StatusEvent, FeedError>>;

/// Parameters of one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub session_id: SessionId,
    /// Results the subscription is filtered to (empty = no result filter)
    pub result_ids: Vec<ResultId>,
    pub event_kinds: Vec<EventKind>,
}

/// Feed errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Connection dropped, stream reset, server-side lifetime reached...
    #[error("Transport error: {0}")]
    Transport(String),

    /// The feed refused the request (malformed filter, unknown session...)
    #[error("Subscription rejected: {0}")]
    Rejected(String),
}

impl FeedError {
    /// Whether resubscribing can fix it
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Transport(_))
    }
}

/// Event feed client
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Open a subscription
    ///
    /// # Errors
    /// - FeedError::Transport if the call could not be established
    /// - FeedError::Rejected if the request itself is invalid
    async fn subscribe(&self, request: SubscriptionRequest) -> Result<EventStream, FeedError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// What one scripted subscription does
    #[derive(Debug, Clone)]
    enum Script {
        /// Deliver the events, then end the stream
        Closing(Vec<StatusEvent>),
        /// Deliver the events, then stay open forever
        Hanging(Vec<StatusEvent>),
        /// Deliver the events, then yield a stream error
        Broken(Vec<StatusEvent>, FeedError),
        /// Fail the subscribe call itself
        Refused(FeedError),
    }

    /// Event feed replaying one script per `subscribe` call, in order
    ///
    /// Once the scripts run out every further subscription hangs, so a test
    /// never spins on an endless resubscription loop.
    #[derive(Clone, Default)]
    pub struct ScriptedEventFeed {
        scripts: Arc<Mutex<VecDeque<Script>>>,
        requests: Arc<Mutex<Vec<SubscriptionRequest>>>,
    }

    impl ScriptedEventFeed {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn push_closing(&self, events: Vec<StatusEvent>) -> &Self {
            self.push(Script::Closing(events))
        }
        pub fn push_hanging(&self, events: Vec<StatusEvent>) -> &Self {
            self.push(Script::Hanging(events))
        }
        pub fn push_broken(&self, events: Vec<StatusEvent>, error: FeedError) -> &Self {
            self.push(Script::Broken(events, error))
        }
        pub fn push_refused(&self, error: FeedError) -> &Self {
            self.push(Script::Refused(error))
        }
        fn push(&self, script: Script) -> &Self {
            self.scripts.lock().unwrap().push_back(script);
            self
        }
        /// Every subscription request received so far
        pub fn requests(&self) -> Vec<SubscriptionRequest> {
            self.requests.lock().unwrap().clone()
        }
        pub fn subscribe_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EventFeed for ScriptedEventFeed {
        async fn subscribe(&self, request: SubscriptionRequest) -> Result<EventStream, FeedError> {
            self.requests.lock().unwrap().push(request);
            let script = self.scripts.lock().unwrap().pop_front();

            let stream = match script {
                Some(Script::Closing(events)) => {
                    futures::stream::iter(events.into_iter().map(Ok)).boxed()
                }
                Some(Script::Hanging(events)) => futures::stream::iter(events.into_iter().map(Ok))
                    .chain(futures::stream::pending())
                    .boxed(),
                Some(Script::Broken(events, error)) => {
                    futures::stream::iter(events.into_iter().map(Ok))
                        .chain(futures::stream::once(async move { Err(error) }))
                        .boxed()
                }
                Some(Script::Refused(error)) => return Err(error),
                None => futures::stream::pending().boxed(),
            };
            Ok(stream)
        }
    }
}
