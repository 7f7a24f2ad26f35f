//! # Web Push
//!
//! New-message notifications for receivers who are not looking at the chat.
//! Delivery goes through the [`PushSender`] trait; [`WebPushSender`] is the
//! VAPID-signed implementation used in production.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rtcchat_core::{BrowserSubscription, NotificationPayload, Store, UserId};
use std::sync::Arc;
use thiserror::Error;
use web_push::{
    ContentEncoding, IsahcWebPushClient, PartialVapidSignatureBuilder, SubscriptionInfo,
    VapidSignatureBuilder, WebPushClient, WebPushError, WebPushMessageBuilder,
};

/// How long the push service keeps an undelivered notification, in seconds.
pub const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum PushError {
    /// The push service no longer knows the endpoint (HTTP 404 or 410).
    #[error("push endpoint is gone")]
    Gone,
    #[error("push delivery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Public application server key, URL-safe base64 without padding.
    fn public_key(&self) -> String;

    async fn send(&self, subscription: &BrowserSubscription, payload: &str)
    -> Result<(), PushError>;
}

// =============================================================================
// VAPID SENDER
// =============================================================================

pub struct WebPushSender {
    client: IsahcWebPushClient,
    signer: PartialVapidSignatureBuilder,
    subject: String,
    public_key: String,
}

impl WebPushSender {
    /// Build a sender from an EC P-256 private key in PEM form.
    pub fn from_pem(private_key_pem: &str, subject: &str) -> Result<Self, PushError> {
        let signer = VapidSignatureBuilder::from_pem_no_sub(private_key_pem.as_bytes())
            .map_err(|e| PushError::Failed(format!("invalid VAPID key: {e}")))?;
        let public_key = URL_SAFE_NO_PAD.encode(signer.get_public_key());
        let client = IsahcWebPushClient::new().map_err(|e| PushError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            signer,
            subject: subject.to_string(),
            public_key,
        })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    fn public_key(&self) -> String {
        self.public_key.clone()
    }

    async fn send(
        &self,
        subscription: &BrowserSubscription,
        payload: &str,
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.as_str(),
            subscription.keys.p256dh.as_str(),
            subscription.keys.auth.as_str(),
        );

        let mut signature = self.signer.clone().add_sub_info(&info);
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build().map_err(classify)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_vapid_signature(signature);
        builder.set_ttl(PUSH_TTL_SECS);
        let message = builder.build().map_err(classify)?;

        self.client.send(message).await.map_err(classify)
    }
}

fn classify(err: WebPushError) -> PushError {
    match err {
        WebPushError::EndpointNotValid { .. } | WebPushError::EndpointNotFound { .. } => {
            PushError::Gone
        }
        other => PushError::Failed(other.to_string()),
    }
}

// =============================================================================
// NOTIFIER
// =============================================================================

/// Sends notifications to every active subscription of a user and forgets
/// subscriptions the push service has dropped.
#[derive(Clone)]
pub struct PushNotifier {
    store: Arc<Store>,
    sender: Option<Arc<dyn PushSender>>,
}

impl PushNotifier {
    pub fn new(store: Arc<Store>, sender: Option<Arc<dyn PushSender>>) -> Self {
        Self { store, sender }
    }

    pub fn public_key(&self) -> Option<String> {
        self.sender.as_ref().map(|s| s.public_key())
    }

    /// Notify in the background. Never blocks or fails the caller.
    pub fn spawn_notify(&self, receiver: UserId, payload: NotificationPayload) {
        if self.sender.is_none() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(receiver, &payload).await;
        });
    }

    /// Returns the number of deliveries the push service accepted.
    pub async fn notify(&self, receiver: UserId, payload: &NotificationPayload) -> usize {
        let Some(sender) = &self.sender else {
            return 0;
        };
        let body = match payload.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode push payload");
                return 0;
            }
        };
        let subscriptions = match self.store.subscriptions_of(receiver) {
            Ok(subs) => subs,
            Err(e) => {
                tracing::warn!(user_id = %receiver, error = %e, "Could not load push subscriptions");
                return 0;
            }
        };

        let mut delivered = 0;
        for sub in subscriptions.into_iter().filter(|s| s.active) {
            let browser = match BrowserSubscription::parse(&sub.sub_obj) {
                Ok(browser) => browser,
                Err(e) => {
                    tracing::warn!(sub_id = %sub.sub_id, error = %e, "Skipping unusable push subscription");
                    continue;
                }
            };
            match sender.send(&browser, &body).await {
                Ok(()) => delivered += 1,
                Err(PushError::Gone) => match self.store.remove_subscription(sub.sub_id) {
                    Ok(_) => tracing::info!(sub_id = %sub.sub_id, "Removed expired push subscription"),
                    Err(e) => {
                        tracing::warn!(sub_id = %sub.sub_id, error = %e, "Could not remove expired push subscription");
                    }
                },
                Err(e) => tracing::warn!(sub_id = %sub.sub_id, error = %e, "Push delivery failed"),
            }
        }
        delivered
    }
}
