//! GraphQL object types.
//!
//! Field names follow the wire names existing clients use: snake_case on the
//! chat records, camelCase on the Relay-style page types.

use super::service::ChatService;
use async_graphql::{ComplexObject, Context, ID, Result, SimpleObject};
use rtcchat_core::{Contact, Message, MessagePage, User, UserId};
use std::sync::Arc;

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User", complex, rename_fields = "snake_case")]
pub struct UserObject {
    pub name: String,
    pub user_id: ID,
    pub img: Option<String>,
    #[graphql(skip)]
    pub id: UserId,
}

#[ComplexObject]
impl UserObject {
    /// Everyone this user is connected with.
    async fn connections(&self, ctx: &Context<'_>) -> Result<Vec<ContactObject>> {
        let service = ctx.data::<Arc<ChatService>>()?;
        let contacts = service.contacts(self.id)?;
        Ok(contacts.into_iter().map(ContactObject::from).collect())
    }
}

impl From<User> for UserObject {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            user_id: ID(user.id.to_string()),
            img: user.img,
            id: user.id,
        }
    }
}

/// The other side of a connection, seen from one participant.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Connection", rename_fields = "snake_case")]
pub struct ContactObject {
    pub name: String,
    pub user_id: ID,
    pub img: Option<String>,
    pub connection_id: ID,
}

impl From<Contact> for ContactObject {
    fn from(contact: Contact) -> Self {
        Self {
            name: contact.name,
            user_id: ID(contact.user_id.to_string()),
            img: contact.img,
            connection_id: ID(contact.connection_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Message", rename_fields = "snake_case")]
pub struct MessageObject {
    pub message_id: ID,
    pub message_text: Option<String>,
    pub message_img: Option<String>,
    /// Epoch milliseconds as a decimal string.
    pub time: String,
    pub connection_id: ID,
    /// The sender.
    pub user_id: ID,
    pub receiver: Option<ID>,
}

impl From<Message> for MessageObject {
    fn from(message: Message) -> Self {
        Self {
            message_id: ID(message.id.to_string()),
            time: message.cursor(),
            message_text: message.text,
            message_img: message.img,
            connection_id: ID(message.connection_id.to_string()),
            user_id: ID(message.sender.to_string()),
            receiver: message.receiver.map(|r| ID(r.to_string())),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "MessageEdge")]
pub struct MessageEdgeObject {
    pub node: MessageObject,
    pub cursor: String,
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "PageInfo")]
pub struct PageInfoObject {
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "MessageConnection")]
pub struct MessageConnectionObject {
    pub total_count: i32,
    pub page_info: PageInfoObject,
    pub edges: Vec<MessageEdgeObject>,
}

impl From<MessagePage> for MessageConnectionObject {
    fn from(page: MessagePage) -> Self {
        Self {
            total_count: i32::try_from(page.total_count).unwrap_or(i32::MAX),
            page_info: PageInfoObject {
                has_previous_page: page.page_info.has_previous_page,
                has_next_page: page.page_info.has_next_page,
                start_cursor: page.page_info.start_cursor,
                end_cursor: page.page_info.end_cursor,
            },
            edges: page
                .edges
                .into_iter()
                .map(|edge| MessageEdgeObject {
                    cursor: edge.cursor,
                    node: MessageObject::from(edge.node),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Token")]
pub struct TokenObject {
    pub token: String,
    pub user: UserObject,
}
