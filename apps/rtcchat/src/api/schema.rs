//! GraphQL schema: queries, mutations and the live message subscription.

use super::auth::RequestAuth;
use super::service::{ChatService, MessageInput};
use super::types::{MessageConnectionObject, MessageObject, TokenObject, UserObject};
use crate::error::ApiError;
use async_graphql::{Context, ID, Object, Result, Schema, Subscription};
use futures::{Stream, StreamExt};
use rtcchat_core::{ConnectionId, MessageId, UserId};
use std::str::FromStr;
use std::sync::Arc;

pub type ChatSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(service: Arc<ChatService>) -> ChatSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(service)
        .finish()
}

fn service<'a>(ctx: &Context<'a>) -> Result<&'a Arc<ChatService>> {
    ctx.data::<Arc<ChatService>>()
}

/// Requests without resolved identity (e.g. over WebSocket) are anonymous.
fn request_auth(ctx: &Context<'_>) -> RequestAuth {
    ctx.data_opt::<RequestAuth>().cloned().unwrap_or_default()
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidId(raw.to_string()))
}

fn parse_opt_id<T: FromStr>(raw: Option<&ID>) -> Result<Option<T>, ApiError> {
    raw.map(|id| parse_id(id.as_str())).transpose()
}

// =============================================================================
// QUERIES
// =============================================================================

pub struct QueryRoot;

#[Object(rename_args = "snake_case")]
impl QueryRoot {
    /// Cheap request that keeps an idle server instance awake.
    async fn wake_up_call(&self) -> bool {
        true
    }

    /// Public VAPID key for `pushManager.subscribe`, null when push is off.
    async fn get_vapid_keys(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        Ok(service(ctx)?.vapid_public_key())
    }

    async fn all_users(&self, ctx: &Context<'_>) -> Result<Vec<UserObject>> {
        let users = service(ctx)?.all_users()?;
        Ok(users.into_iter().map(UserObject::from).collect())
    }

    async fn user_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let count = service(ctx)?.user_count()?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn find_user(&self, ctx: &Context<'_>, user_id: ID) -> Result<Option<UserObject>> {
        let id: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.find_user(id)?.map(UserObject::from))
    }

    /// The user named by the request's bearer token.
    async fn me(&self, ctx: &Context<'_>) -> Option<UserObject> {
        request_auth(ctx).user.map(UserObject::from)
    }

    /// Newest-first window of a conversation, returned oldest first.
    async fn all_messages(
        &self,
        ctx: &Context<'_>,
        connection_id: ID,
        first: Option<i32>,
        before: Option<String>,
    ) -> Result<MessageConnectionObject> {
        let connection: ConnectionId = parse_id(&connection_id)?;
        let page = service(ctx)?.messages(
            connection,
            first.map(i64::from),
            before.as_deref(),
        )?;
        Ok(page.into())
    }

    /// JSON array of `{connection_id, unseen}` for the user.
    async fn get_unseen_msgs(&self, ctx: &Context<'_>, user_id: ID) -> Result<String> {
        let user: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.unseen_json(user)?)
    }

    /// JSON of the stored subscription, or null.
    async fn get_sub(&self, ctx: &Context<'_>, sub: String, user_id: ID) -> Result<Option<String>> {
        let user: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.subscription_json(user, &sub))
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

pub struct MutationRoot;

#[Object(rename_args = "snake_case")]
impl MutationRoot {
    async fn add_user(
        &self,
        ctx: &Context<'_>,
        name: String,
        pwd: String,
        img: Option<String>,
    ) -> Result<UserObject> {
        let user = service(ctx)?.add_user(&name, &pwd, img).await?;
        Ok(user.into())
    }

    /// Set the caller's profile picture. `user_id` is accepted for client
    /// compatibility; the caller is always the one updated.
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        img: Option<String>,
        #[graphql(name = "user_id")] _user_id: Option<ID>,
    ) -> Result<UserObject> {
        let user = service(ctx)?.update_user(&request_auth(ctx), img)?;
        Ok(user.into())
    }

    async fn login(&self, ctx: &Context<'_>, name: String, pwd: String) -> Result<TokenObject> {
        let (token, user) = service(ctx)?.login(&name, &pwd).await?;
        Ok(TokenObject {
            token,
            user: user.into(),
        })
    }

    async fn add_contact(&self, ctx: &Context<'_>, name: String) -> Result<UserObject> {
        let me = service(ctx)?.add_contact(&request_auth(ctx), &name)?;
        Ok(me.into())
    }

    async fn create_message(
        &self,
        ctx: &Context<'_>,
        message_text: Option<String>,
        message_img: Option<String>,
        time: Option<String>,
        connection_id: ID,
        user_id: ID,
        receiver: Option<ID>,
    ) -> Result<MessageObject> {
        let time = time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<i64>()
                    .map_err(|_| ApiError::Rejected(format!("Invalid time: {t}")))
            })
            .transpose()?;
        let input = MessageInput {
            text: message_text,
            img: message_img,
            time,
            connection_id: parse_id(&connection_id)?,
            sender: parse_id(&user_id)?,
            receiver: parse_opt_id(receiver.as_ref())?,
        };
        let message = service(ctx)?.create_message(&request_auth(ctx), input)?;
        Ok(message.into())
    }

    async fn edit_message(
        &self,
        ctx: &Context<'_>,
        user_id: Option<ID>,
        message_id: ID,
        message_text: String,
    ) -> Result<bool> {
        let id: MessageId = parse_id(&message_id)?;
        let sender: Option<UserId> = parse_opt_id(user_id.as_ref())?;
        Ok(service(ctx)?.edit_message(&request_auth(ctx), sender, id, &message_text)?)
    }

    async fn set_unseen_msgs(
        &self,
        ctx: &Context<'_>,
        unseen: bool,
        connection_id: ID,
        user_id: ID,
    ) -> Result<bool> {
        let connection: ConnectionId = parse_id(&connection_id)?;
        let user: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.set_unseen(user, connection, unseen)?)
    }

    /// Returns the stored subscription as JSON, or a failure text.
    async fn register_sub(&self, ctx: &Context<'_>, sub: String, user_id: ID) -> Result<String> {
        let user: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.register_subscription(user, &sub))
    }

    async fn remove_sub(&self, ctx: &Context<'_>, sub: String, user_id: ID) -> Result<String> {
        let user: UserId = parse_id(&user_id)?;
        Ok(service(ctx)?.remove_subscription(user, &sub))
    }

    /// Delete read conversations when the database is over its size limit.
    /// Returns whether the cleanup ran.
    async fn run_db_cleanup(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(service(ctx)?.run_cleanup(&request_auth(ctx))?)
    }

    #[graphql(name = "clearTestDB")]
    async fn clear_test_db(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(service(ctx)?.clear_test_db()?)
    }

    async fn clear_visitor(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(service(ctx)?.clear_visitor(&request_auth(ctx))?)
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

pub struct SubscriptionRoot;

#[Subscription(rename_args = "snake_case")]
impl SubscriptionRoot {
    /// Messages created or edited in `connection_id` and addressed to `user_id`.
    async fn new_message(
        &self,
        ctx: &Context<'_>,
        connection_id: Option<ID>,
        user_id: Option<ID>,
    ) -> Result<impl Stream<Item = MessageObject>> {
        let connection: Option<ConnectionId> = parse_opt_id(connection_id.as_ref())?;
        let receiver: Option<UserId> = parse_opt_id(user_id.as_ref())?;
        Ok(service(ctx)?
            .new_messages(connection, receiver)
            .map(MessageObject::from))
    }
}
