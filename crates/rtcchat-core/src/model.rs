//! # Model
//!
//! Records kept by the store and the input types used to create them.

use crate::error::ValidationError;
use crate::primitives::{MAX_MESSAGE_TIME, MAX_NAME_LEN, MAX_PASSWORD_LEN, MIN_MESSAGE_TIME};
use crate::{ConnectionId, MessageId, SubscriptionId, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// USERS AND CONNECTIONS
// =============================================================================

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// bcrypt hash, never sent to clients.
    pub password_hash: String,
    /// Profile picture as a data URL.
    pub img: Option<String>,
}

/// A friendship between two users. Its id doubles as the chat-room id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_one: UserId,
    pub user_two: UserId,
}

impl Connection {
    /// Check whether `user` is one of the two participants.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.user_one == user || self.user_two == user
    }

    /// The participant that is not `user`, if `user` takes part at all.
    #[must_use]
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.user_one == user {
            Some(self.user_two)
        } else if self.user_two == user {
            Some(self.user_one)
        } else {
            None
        }
    }
}

/// One side's view of a connection: who is on the other end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub name: String,
    pub img: Option<String>,
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: Option<String>,
    pub img: Option<String>,
    /// Epoch milliseconds. Also the pagination cursor.
    pub time: i64,
    pub connection_id: ConnectionId,
    pub sender: UserId,
    pub receiver: Option<UserId>,
}

impl Message {
    /// The cursor clients use to page backwards from this message.
    #[must_use]
    pub fn cursor(&self) -> String {
        self.time.to_string()
    }
}

/// Input for [`crate::Store::create_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: Option<String>,
    pub img: Option<String>,
    pub time: i64,
    pub connection_id: ConnectionId,
    pub sender: UserId,
    pub receiver: Option<UserId>,
}

impl NewMessage {
    /// Drop empty text/image fields and reject a message with neither.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.text = self.text.filter(|t| !t.is_empty());
        self.img = self.img.filter(|i| !i.is_empty());
        if self.text.is_none() && self.img.is_none() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(self)
    }
}

// =============================================================================
// UNSEEN FLAGS AND PUSH SUBSCRIPTIONS
// =============================================================================

/// Unread state of one conversation for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnseenFlag {
    pub connection_id: ConnectionId,
    pub unseen: bool,
}

/// A browser push endpoint registered by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub sub_id: SubscriptionId,
    pub user_id: UserId,
    /// The browser's `PushSubscription` serialized as JSON.
    pub sub_obj: String,
    pub active: bool,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate sign-up or login input. Returns the trimmed user name.
pub fn validate_credentials(name: &str, password: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong {
            max: MAX_PASSWORD_LEN,
        });
    }
    Ok(name.to_string())
}

/// Check a client-supplied message time (epoch milliseconds).
pub fn validate_message_time(time: i64) -> Result<i64, ValidationError> {
    if (MIN_MESSAGE_TIME..=MAX_MESSAGE_TIME).contains(&time) {
        Ok(time)
    } else {
        Err(ValidationError::InvalidTime(time))
    }
}
