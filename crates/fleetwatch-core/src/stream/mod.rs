// ── Change notification ──
//
// Fan-out of `ChangeEvent`s to any number of subscribers. Publishing
// never blocks; a subscriber that falls behind skips what it missed.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{trace, warn};

use crate::model::ChangeEvent;

pub use filter::{EventFilter, ServerFilter};

/// Broadcast hub for change events.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeNotifier {
    /// `capacity` is the per-subscriber backlog before events are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        let kind = event.kind();
        if self.sender.send(Arc::new(event)).is_err() {
            trace!(kind, "no subscribers for change event");
        }
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.sender.subscribe(), EventFilter::All)
    }

    /// Subscribe to events concerning a single server.
    pub fn subscribe_server(&self, name: impl Into<String>) -> EventStream {
        EventStream::new(self.sender.subscribe(), EventFilter::Server(name.into()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A subscription to change events, in publish order.
///
/// Ends once every `ChangeNotifier` handle has been dropped.
pub struct EventStream {
    inner: BroadcastStream<Arc<ChangeEvent>>,
    filter: EventFilter,
}

impl EventStream {
    fn new(receiver: broadcast::Receiver<Arc<ChangeEvent>>, filter: EventFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// Wait for the next matching event. `None` when the notifier is gone.
    pub async fn next_event(&mut self) -> Option<Arc<ChangeEvent>> {
        self.next().await
    }
}

impl Stream for EventStream {
    type Item = Arc<ChangeEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(skipped, "event subscriber lagged, skipping missed events");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
