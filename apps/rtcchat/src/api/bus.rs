//! In-process fan-out of created and edited messages to live subscribers.

use futures::Stream;
use rtcchat_core::{Message, MessageFilter};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Message>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Hand a message to every current subscriber. Returns how many
    /// subscribers were listening; nobody listening is not an error.
    pub fn publish(&self, message: Message) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Messages published from now on that match `filter`.
    pub fn subscribe(&self, filter: MessageFilter) -> impl Stream<Item = Message> + Send + 'static {
        let rx = self.tx.subscribe();
        futures::stream::unfold((rx, filter), |(mut rx, filter)| async move {
            loop {
                match rx.recv().await {
                    Ok(message) if filter.matches(&message) => {
                        return Some((message, (rx, filter)));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Live subscriber fell behind, messages dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}
