//! # Push Subscription Data
//!
//! The browser hands the client a `PushSubscription` object, which the client
//! sends to the server as JSON. The server stores that JSON verbatim and only
//! looks inside it for the endpoint and the encryption keys.
//!
//! This module also defines the payload the service worker expects.

use crate::error::ValidationError;
use crate::{Message, UserId};
use serde::{Deserialize, Serialize};

/// Encryption keys of a browser subscription, base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// The parts of a browser `PushSubscription` the server uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl BrowserSubscription {
    /// Parse the JSON produced by `PushSubscription.toJSON()`.
    pub fn parse(json: &str) -> Result<Self, ValidationError> {
        let sub: Self = serde_json::from_str(json)
            .map_err(|e| ValidationError::InvalidSubscription(e.to_string()))?;
        if sub.endpoint.is_empty() || sub.keys.auth.is_empty() || sub.keys.p256dh.is_empty() {
            return Err(ValidationError::InvalidSubscription(
                "endpoint and keys must not be empty".to_string(),
            ));
        }
        Ok(sub)
    }
}

/// Extract `keys.auth`, which identifies a browser subscription across
/// re-serializations of the same object.
pub fn auth_key(json: &str) -> Result<String, ValidationError> {
    BrowserSubscription::parse(json).map(|s| s.keys.auth)
}

/// Body of a new-message notification, read by the service worker.
///
/// `sender` lets the worker skip the notification while that chat is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Display name of the sender, shown as the notification title.
    pub title: String,
    /// Message text; absent for image-only messages.
    pub content: Option<String>,
    pub receiver: Option<String>,
    pub sender: String,
}

impl NotificationPayload {
    #[must_use]
    pub fn for_message(sender_name: &str, sender: UserId, message: &Message) -> Self {
        Self {
            title: sender_name.to_string(),
            content: message.text.clone(),
            receiver: message.receiver.map(|r| r.to_string()),
            sender: sender.to_string(),
        }
    }

    /// Serialize to the JSON text pushed to the browser.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
