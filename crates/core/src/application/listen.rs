// Event Listener - dispatch a raw subscription to caller-supplied handlers

use crate::application::cancel::CancelToken;
use crate::domain::{EventKind, StatusEvent};
use crate::error::{Result, WatchError};
use crate::port::{EventFeed, SubscriptionRequest};
use futures::StreamExt;
use tracing::debug;

/// Event handler: `(session_id, kind, event) -> stop`
///
/// Returning `true` closes the subscription.
pub type EventHandler = Box<dyn FnMut(&str, EventKind, &StatusEvent) -> bool + Send>;

/// Consume one subscription, feeding every event to `handlers` in order
///
/// The first handler returning `true` stops the stream; the handlers after it
/// are not called for that event. Unlike a watch, this does not resubscribe.
///
/// # Returns
/// Number of events dispatched
///
/// # Errors
/// - WatchError::Feed if the subscription fails or the stream breaks
/// - WatchError::Cancelled if `cancel` fires first
pub async fn listen(
    feed: &dyn EventFeed,
    request: SubscriptionRequest,
    handlers: &mut [EventHandler],
    cancel: CancelToken,
) -> Result<usize> {
    let session_id = request.session_id.clone();
    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(WatchError::Cancelled),
        stream = feed.subscribe(request) => stream?,
    };

    let mut dispatched = 0;
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WatchError::Cancelled),
            item = stream.next() => match item {
                Some(event) => event?,
                None => break,
            },
        };

        dispatched += 1;
        let kind = event.kind();
        if handlers
            .iter_mut()
            .any(|handler| handler(&session_id, kind, &event))
        {
            debug!(session_id = %session_id, dispatched, "Listener stopped by handler");
            break;
        }
    }
    Ok(dispatched)
}
