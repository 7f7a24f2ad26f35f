//! Error types for the chat core.

use crate::{ConnectionId, MessageId, UserId};
use thiserror::Error;

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing username or password")]
    MissingCredentials,

    #[error("Username must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("Password must be at most {max} bytes")]
    PasswordTooLong { max: usize },

    #[error("Message has neither text nor image")]
    EmptyMessage,

    #[error("Page size must be at least 1, got {0}")]
    InvalidPageSize(i64),

    #[error("Invalid time: {0}")]
    InvalidTime(i64),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid push subscription: {0}")]
    InvalidSubscription(String),
}

/// Storage-related errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username {0} is taken")]
    NameTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("A user cannot be connected to themselves")]
    SelfConnection,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// redb splits its failures across one type per phase; they all fold into
// `redb::Error`.
macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Database(redb::Error::from(err))
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Result alias used by the store.
pub type StoreResult<T> = Result<T, StoreError>;
