//! Table layout.
//!
//! ```text
//! meta              &str                      -> u64    counters, schema version
//! users             user_id                   -> User
//! user_names        name                      -> user_id
//! connections       connection_id             -> Connection
//! user_connections  (user_id, other_user_id)  -> connection_id
//! messages          message_id                -> Message
//! conversation      (connection_id, time, id) -> ()
//! unseen            (user_id, connection_id)  -> bool
//! subscriptions     sub_id                    -> PushSubscription
//! user_subs         (user_id, sub_id)         -> ()
//! ```

use redb::TableDefinition;

/// Current on-disk layout version.
pub const SCHEMA_VERSION: u64 = 2;

pub(crate) const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub(crate) const USER_NAMES: TableDefinition<&str, u64> = TableDefinition::new("user_names");
pub(crate) const CONNECTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("connections");
pub(crate) const USER_CONNECTIONS: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("user_connections");
pub(crate) const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");
pub(crate) const CONVERSATION: TableDefinition<(u64, i64, u64), ()> =
    TableDefinition::new("conversation");
pub(crate) const UNSEEN: TableDefinition<(u64, u64), bool> = TableDefinition::new("unseen");
pub(crate) const SUBSCRIPTIONS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("subscriptions");
pub(crate) const USER_SUBS: TableDefinition<(u64, u64), ()> = TableDefinition::new("user_subs");

pub(crate) const KEY_SCHEMA_VERSION: &str = "schema_version";
pub(crate) const KEY_NEXT_USER: &str = "next_user_id";
pub(crate) const KEY_NEXT_CONNECTION: &str = "next_connection_id";
pub(crate) const KEY_NEXT_MESSAGE: &str = "next_message_id";
pub(crate) const KEY_NEXT_SUBSCRIPTION: &str = "next_sub_id";
