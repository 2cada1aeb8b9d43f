// Result Status Probe Port
// One-shot status lookup used to catch up right after (re)subscribing
use crate::domain::{ResultId, ResultStatus};
use crate::port::FeedError;
use async_trait::async_trait;

/// Current-status lookup for a set of results
///
/// The event feed only reports transitions that happen while a subscription
/// is open. A result that completed between two subscriptions is only seen
/// through this port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStatusProbe: Send + Sync {
    /// Get the current status of each requested result
    ///
    /// Results unknown to the service may be omitted from the answer.
    async fn current_statuses(
        &self,
        session_id: &str,
        result_ids: &[ResultId],
    ) -> Result<Vec<(ResultId, ResultStatus)>, FeedError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    /// Probe answering from a fixed status table
    #[derive(Clone, Default)]
    pub struct StaticStatusProbe {
        statuses: Arc<Mutex<HashMap<ResultId, ResultStatus>>>,
        call_count: Arc<Mutex<usize>>,
    }
    impl StaticStatusProbe {
        /// Probe that knows nothing (every result is still in flight)
        pub fn new() -> Self {
            Self::default()
        }
        pub fn with_status(self, result_id: impl Into<ResultId>, status: ResultStatus) -> Self {
            self.set_status(result_id, status);
            self
        }
        pub fn set_status(&self, result_id: impl Into<ResultId>, status: ResultStatus) {
            self.statuses.lock().unwrap().insert(result_id.into(), status);
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }
    #[async_trait]
    impl ResultStatusProbe for StaticStatusProbe {
        async fn current_statuses(
            &self,
            _session_id: &str,
            result_ids: &[ResultId],
        ) -> Result<Vec<(ResultId, ResultStatus)>, FeedError> {
            *self.call_count.lock().unwrap() += 1;
            let statuses = self.statuses.lock().unwrap();
            Ok(result_ids
                .iter()
                .filter_map(|id| statuses.get(id).map(|status| (id.clone(), *status)))
                .collect())
        }
    }
}
