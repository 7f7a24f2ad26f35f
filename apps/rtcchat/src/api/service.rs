//! # Chat Service
//!
//! The operations behind the GraphQL resolvers. Resolvers parse arguments
//! and shape output; authorization, validation, storage, live delivery and
//! push notification happen here.

use super::auth::{
    ADMIN_TOKEN_HEADER, LoginLimiter, RequestAuth, TokenKeys, admin_token_matches, bearer_token,
    hash_password, verify_password,
};
use super::bus::MessageBus;
use super::push::{PushNotifier, PushSender};
use crate::config::{ConfigError, ServerConfig};
use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use futures::Stream;
use rtcchat_core::primitives::VISITOR_NAME;
use rtcchat_core::{
    CleanupOutcome, ConnectionId, Contact, Message, MessageFilter, MessageId, MessagePage,
    NewMessage, NotificationPayload, PageRequest, Store, User, UserId, validate_credentials,
    validate_message_time,
};
use std::sync::Arc;

/// Fields of a `createMessage` call.
#[derive(Debug, Clone)]
pub struct MessageInput {
    pub text: Option<String>,
    pub img: Option<String>,
    /// Epoch milliseconds; the server clock is used when absent.
    pub time: Option<i64>,
    pub connection_id: ConnectionId,
    pub sender: UserId,
    pub receiver: Option<UserId>,
}

pub struct ChatService {
    store: Arc<Store>,
    config: ServerConfig,
    tokens: TokenKeys,
    login_limiter: LoginLimiter,
    bus: MessageBus,
    push: PushNotifier,
}

impl ChatService {
    pub fn new(
        store: Arc<Store>,
        config: ServerConfig,
        push_sender: Option<Arc<dyn PushSender>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tokens: TokenKeys::new(&config.token_secret, config.token_ttl_days),
            login_limiter: LoginLimiter::per_minute(config.login_quota()?),
            bus: MessageBus::new(config.bus_capacity),
            push: PushNotifier::new(store.clone(), push_sender),
            store,
            config,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    // =========================================================================
    // REQUEST IDENTITY
    // =========================================================================

    /// Resolve the caller from request headers. A missing, invalid or expired
    /// token, or one naming a deleted user, makes the request anonymous.
    pub fn authenticate(&self, headers: &HeaderMap) -> RequestAuth {
        let presented = headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        let admin_token = admin_token_matches(self.config.admin_token.as_deref(), presented);

        let user = bearer_token(headers)
            .and_then(|token| self.tokens.verify(token))
            .and_then(|claims| match self.store.user(claims.user_id) {
                Ok(user) => user.filter(|u| u.name == claims.name),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not load token user");
                    None
                }
            });
        RequestAuth { user, admin_token }
    }

    fn require_admin(&self, auth: &RequestAuth) -> ApiResult<()> {
        if auth.admin_token {
            return Ok(());
        }
        match &auth.user {
            Some(user) if self.config.is_admin_name(&user.name) => Ok(()),
            Some(_) => Err(ApiError::Forbidden("administrators only")),
            None => Err(ApiError::Unauthenticated),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn vapid_public_key(&self) -> Option<String> {
        self.push.public_key()
    }

    pub fn all_users(&self) -> ApiResult<Vec<User>> {
        Ok(self.store.users()?)
    }

    pub fn user_count(&self) -> ApiResult<usize> {
        Ok(self.store.user_count()?)
    }

    pub fn find_user(&self, id: UserId) -> ApiResult<Option<User>> {
        Ok(self.store.user(id)?)
    }

    pub fn contacts(&self, user: UserId) -> ApiResult<Vec<Contact>> {
        Ok(self.store.contacts_of(user)?)
    }

    pub fn messages(
        &self,
        connection: ConnectionId,
        first: Option<i64>,
        before: Option<&str>,
    ) -> ApiResult<MessagePage> {
        let request = PageRequest::from_args(first, before)?;
        Ok(self.store.message_page(connection, request, now_millis())?)
    }

    /// Unread flags of a user as a JSON array of `{connection_id, unseen}`.
    pub fn unseen_json(&self, user: UserId) -> ApiResult<String> {
        let flags = self.store.unseen_flags(user)?;
        serde_json::to_string(&flags).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode unseen flags");
            ApiError::Rejected("Can't fetch unseen messages, server is busy.".to_string())
        })
    }

    /// The stored record for exactly this subscription JSON, as JSON.
    pub fn subscription_json(&self, user: UserId, sub: &str) -> Option<String> {
        match self.store.find_subscription(user, sub) {
            Ok(found) => found.and_then(|s| serde_json::to_string(&s).ok()),
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching subscription");
                None
            }
        }
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    pub async fn add_user(&self, name: &str, pwd: &str, img: Option<String>) -> ApiResult<User> {
        let name = validate_credentials(name, pwd)?;
        if self.store.user_by_name(&name)?.is_some() {
            return Err(ApiError::Rejected(format!("Username {name} is taken")));
        }
        let hash = hash_password(pwd.to_string(), self.config.bcrypt_cost).await?;
        let user = self.store.create_user(&name, &hash, img)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub fn update_user(&self, auth: &RequestAuth, img: Option<String>) -> ApiResult<User> {
        let me = auth.require_user()?;
        Ok(self.store.update_user_img(me.id, img)?)
    }

    /// Check credentials and issue a session token.
    pub async fn login(&self, name: &str, pwd: &str) -> ApiResult<(String, User)> {
        self.login_limiter.check()?;
        let Some(user) = self.store.user_by_name(name.trim())? else {
            return Err(ApiError::WrongCredentials);
        };
        if !verify_password(pwd.to_string(), user.password_hash.clone()).await? {
            return Err(ApiError::WrongCredentials);
        }
        let token = self.tokens.issue(&user)?;
        Ok((token, user))
    }

    /// Connect the caller with the user called `name`. Returns the caller.
    pub fn add_contact(&self, auth: &RequestAuth, name: &str) -> ApiResult<User> {
        let me = auth.require_user()?;
        let name = name.trim();
        let Some(contact) = self.store.user_by_name(name)? else {
            return Err(ApiError::UnknownUser(name.to_string()));
        };
        let connection = self.store.create_connection(me.id, contact.id)?;
        tracing::debug!(connection_id = %connection.id, "Contact added");
        self.store
            .user(me.id)?
            .ok_or_else(|| ApiError::Rejected(format!("User {} not found", me.name)))
    }

    // =========================================================================
    // MESSAGES
    // =========================================================================

    /// Store a message, mark it unread for the receiver, deliver it to live
    /// subscribers and notify the receiver's devices.
    pub fn create_message(&self, auth: &RequestAuth, input: MessageInput) -> ApiResult<Message> {
        let me = auth.require_user()?;
        if input.sender != me.id {
            return Err(ApiError::Forbidden("messages can only be sent as yourself"));
        }
        let connection = self
            .store
            .connection(input.connection_id)?
            .ok_or_else(|| {
                ApiError::Rejected(format!("Connection not found: {}", input.connection_id))
            })?;
        let Some(other) = connection.other(me.id) else {
            return Err(ApiError::Forbidden("not a participant of this connection"));
        };
        let receiver = match input.receiver {
            Some(r) if r == other => r,
            Some(_) => return Err(ApiError::Forbidden("receiver is not part of this connection")),
            None => other,
        };
        let time = match input.time {
            Some(t) => validate_message_time(t)?,
            None => now_millis(),
        };

        let message = self.store.create_message(NewMessage {
            text: input.text,
            img: input.img,
            time,
            connection_id: connection.id,
            sender: me.id,
            receiver: Some(receiver),
        })?;

        let listeners = self.bus.publish(message.clone());
        tracing::debug!(message_id = %message.id, listeners, "Message created");

        self.push.spawn_notify(
            receiver,
            NotificationPayload::for_message(&me.name, me.id, &message),
        );
        Ok(message)
    }

    /// Replace the text of one of the caller's messages and republish it.
    pub fn edit_message(
        &self,
        auth: &RequestAuth,
        sender: Option<UserId>,
        id: MessageId,
        text: &str,
    ) -> ApiResult<bool> {
        let me = auth.require_user()?;
        if sender.is_some_and(|s| s != me.id) {
            return Err(ApiError::Forbidden("messages can only be edited by their author"));
        }
        let Some(existing) = self.store.message(id)? else {
            return Err(ApiError::Rejected(format!("Message not found: {id}")));
        };
        if existing.sender != me.id {
            return Err(ApiError::Forbidden("messages can only be edited by their author"));
        }
        if text.is_empty() && existing.img.is_none() {
            return Err(rtcchat_core::ValidationError::EmptyMessage.into());
        }
        let edited = self.store.update_message_text(id, text)?;
        self.bus.publish(edited);
        Ok(true)
    }

    pub fn set_unseen(&self, user: UserId, connection: ConnectionId, unseen: bool) -> ApiResult<bool> {
        self.store.set_unseen(user, connection, unseen)?;
        Ok(true)
    }

    /// Live messages for `receiver` in `connection`.
    pub fn new_messages(
        &self,
        connection: Option<ConnectionId>,
        receiver: Option<UserId>,
    ) -> impl Stream<Item = Message> + Send + 'static {
        self.bus.subscribe(MessageFilter::new(connection, receiver))
    }

    // =========================================================================
    // PUSH SUBSCRIPTIONS
    // =========================================================================

    /// Store or re-activate a subscription. Failures are reported in the
    /// returned text, which the client logs.
    pub fn register_subscription(&self, user: UserId, sub: &str) -> String {
        let stored = self
            .store
            .register_subscription(user, sub)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::to_string(&s).map_err(|e| e.to_string()));
        match stored {
            Ok(json) => json,
            Err(reason) => {
                tracing::warn!(user_id = %user, %reason, "Failed to save push subscription");
                format!("Failed to save subscription data: {reason}")
            }
        }
    }

    pub fn remove_subscription(&self, user: UserId, sub: &str) -> String {
        match self.store.deactivate_subscription(user, sub) {
            Ok(_) => "Succesfully unsubscribed".to_string(),
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Unsubscribing failed");
                "Unsubscribing failed".to_string()
            }
        }
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Run the size-triggered cleanup with the configured limit.
    pub fn cleanup_now(&self) -> ApiResult<CleanupOutcome> {
        let outcome = self.store.cleanup(self.config.db_size_limit_bytes())?;
        tracing::info!(
            size_bytes = outcome.size_bytes,
            limit_bytes = outcome.limit_bytes,
            performed = outcome.performed,
            deleted = outcome.messages_deleted,
            "Database cleanup checked"
        );
        Ok(outcome)
    }

    pub fn run_cleanup(&self, auth: &RequestAuth) -> ApiResult<bool> {
        self.require_admin(auth)?;
        Ok(self.cleanup_now()?.performed)
    }

    pub fn clear_test_db(&self) -> ApiResult<bool> {
        if self.config.environment != crate::config::Environment::Test {
            return Err(ApiError::Disabled);
        }
        match self.store.clear() {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(error = %e, "Clearing the test database failed");
                Ok(false)
            }
        }
    }

    pub fn clear_visitor(&self, auth: &RequestAuth) -> ApiResult<bool> {
        self.require_admin(auth)?;
        match self.store.clear_visitor(VISITOR_NAME) {
            Ok(cleared) => {
                if let Some(connection) = cleared {
                    tracing::info!(connection_id = %connection, "Visitor conversation cleared");
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Clearing the visitor conversation failed");
                Ok(false)
            }
        }
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
