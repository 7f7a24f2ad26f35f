//! # RTCChat Core
//!
//! Storage and rules of a two-party chat service.
//!
//! Users befriend each other through *connections*; a connection is also the
//! chat room its two participants talk in. Messages are paged backwards by
//! timestamp cursor, each conversation carries a per-user unread flag, and
//! users may register browser push endpoints to be notified of new messages.
//!
//! This crate is synchronous and free of network code. The server in
//! `apps/rtcchat` wraps it with GraphQL, WebSocket delivery and Web Push.

pub mod error;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod primitives;
pub mod push;
pub mod storage;

pub use error::{StoreError, StoreResult, ValidationError};
pub use filter::MessageFilter;
pub use model::{
    Connection, Contact, Message, NewMessage, PushSubscription, UnseenFlag, User,
    validate_credentials, validate_message_time,
};
pub use pagination::{MessageEdge, MessagePage, PageInfo, PageRequest};
pub use primitives::{ConnectionId, MessageId, SubscriptionId, UserId};
pub use push::{BrowserSubscription, NotificationPayload};
pub use storage::{CleanupOutcome, Store, StoreStats};
