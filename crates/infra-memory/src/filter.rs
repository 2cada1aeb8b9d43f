// Subscription filter
use resultwatch_core::domain::{EventKind, ResultId, SessionId, StatusEvent};
use resultwatch_core::port::SubscriptionRequest;
use std::collections::HashSet;

/// Server-side view of a subscription request
///
/// An empty id set or kind list means "no filter" on that axis. The result
/// id filter only applies to events that carry a result identifier.
#[derive(Debug, Clone)]
pub struct EventFilter {
    session_id: SessionId,
    result_ids: HashSet<ResultId>,
    event_kinds: Vec<EventKind>,
}

impl EventFilter {
    pub fn matches(&self, session_id: &str, event: &StatusEvent) -> bool {
        if session_id != self.session_id {
            return false;
        }
        if !self.event_kinds.is_empty() && !self.event_kinds.contains(&event.kind()) {
            return false;
        }
        match event.result_id() {
            Some(id) if !self.result_ids.is_empty() => self.result_ids.contains(id),
            _ => true,
        }
    }

    pub fn result_id_count(&self) -> usize {
        self.result_ids.len()
    }
}

impl From<&SubscriptionRequest> for EventFilter {
    fn from(request: &SubscriptionRequest) -> Self {
        Self {
            session_id: request.session_id.clone(),
            result_ids: request.result_ids.iter().cloned().collect(),
            event_kinds: request.event_kinds.clone(),
        }
    }
}
