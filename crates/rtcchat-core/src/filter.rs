//! # Live Message Filter
//!
//! Decides which published messages a live subscriber receives.
//!
//! A subscriber names the conversation it has open and its own user id. It
//! is sent a message only when both match: messages in other conversations
//! are not its business, and its own messages are already on its screen.

use crate::{ConnectionId, Message, UserId};

/// Per-subscriber selection of live messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub connection_id: Option<ConnectionId>,
    pub receiver: Option<UserId>,
}

impl MessageFilter {
    #[must_use]
    pub fn new(connection_id: Option<ConnectionId>, receiver: Option<UserId>) -> Self {
        Self {
            connection_id,
            receiver,
        }
    }

    /// A filter missing either field matches nothing.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        match (self.connection_id, self.receiver) {
            (Some(connection_id), Some(receiver)) => {
                message.connection_id == connection_id && message.receiver == Some(receiver)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    fn message(connection: u64, receiver: Option<u64>) -> Message {
        Message {
            id: MessageId(1),
            text: Some("hi".to_string()),
            img: None,
            time: 1,
            connection_id: ConnectionId(connection),
            sender: UserId(99),
            receiver: receiver.map(UserId),
        }
    }

    #[test]
    fn matches_connection_and_receiver() {
        let filter = MessageFilter::new(Some(ConnectionId(1)), Some(UserId(2)));
        assert!(filter.matches(&message(1, Some(2))));
        assert!(!filter.matches(&message(2, Some(2))));
        assert!(!filter.matches(&message(1, Some(3))));
        assert!(!filter.matches(&message(1, None)));
    }

    #[test]
    fn incomplete_filter_matches_nothing() {
        assert!(!MessageFilter::default().matches(&message(1, Some(2))));
        assert!(!MessageFilter::new(Some(ConnectionId(1)), None).matches(&message(1, Some(2))));
        assert!(!MessageFilter::new(None, Some(UserId(2))).matches(&message(1, Some(2))));
    }
}
