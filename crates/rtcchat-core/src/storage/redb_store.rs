//! redb-backed chat store.

use super::tables::{
    CONNECTIONS, CONVERSATION, KEY_NEXT_CONNECTION, KEY_NEXT_MESSAGE, KEY_NEXT_SUBSCRIPTION,
    KEY_NEXT_USER, KEY_SCHEMA_VERSION, MESSAGES, META, SCHEMA_VERSION, SUBSCRIPTIONS, UNSEEN,
    USER_CONNECTIONS, USER_NAMES, USER_SUBS, USERS,
};
use crate::error::{StoreError, StoreResult};
use crate::model::{Connection, Contact, Message, NewMessage, PushSubscription, UnseenFlag, User};
use crate::pagination::{MessagePage, PageRequest};
use crate::push::auth_key;
use crate::{ConnectionId, MessageId, SubscriptionId, UserId};
use redb::{Database, ReadableDatabase, ReadableTable, Table, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

type RecordTable<'txn> = Table<'txn, u64, &'static [u8]>;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Row counts and on-disk size, for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub connections: usize,
    pub messages: usize,
    pub subscriptions: usize,
    pub size_bytes: u64,
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    /// The size limit was reached and deletion ran.
    pub performed: bool,
    pub size_bytes: u64,
    pub limit_bytes: u64,
    pub messages_deleted: usize,
}

// =============================================================================
// STORE
// =============================================================================

/// The chat database.
///
/// All operations are synchronous and short. `Store` is `Send + Sync`; share
/// it behind an `Arc`.
pub struct Store {
    db: Database,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (or create) a database file and bring its layout up to date.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        let store = Self {
            db,
            path: Some(path.to_path_buf()),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open a throwaway database held in memory.
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db, path: None };
        store.migrate()?;
        Ok(store)
    }

    /// Database file, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create missing tables and run layout upgrades.
    fn migrate(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        create_tables(&txn)?;
        {
            let mut meta = txn.open_table(META)?;
            let found = meta.get(KEY_SCHEMA_VERSION)?.map(|g| g.value());
            match found {
                None => {
                    // Fresh database, or one written before versioning began.
                    // The latter has subscriptions but no per-user index.
                    rebuild_user_subs(&txn)?;
                }
                Some(1) => rebuild_user_subs(&txn)?,
                Some(_) => {}
            }
            meta.insert(KEY_SCHEMA_VERSION, SCHEMA_VERSION)?;
        }
        txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Register a user. Fails with [`StoreError::NameTaken`] on a duplicate name.
    pub fn create_user(
        &self,
        name: &str,
        password_hash: &str,
        img: Option<String>,
    ) -> StoreResult<User> {
        let txn = self.db.begin_write()?;
        let user = {
            let mut names = txn.open_table(USER_NAMES)?;
            if names.get(name)?.is_some() {
                return Err(StoreError::NameTaken(name.to_string()));
            }
            let mut meta = txn.open_table(META)?;
            let id = UserId(next_id(&mut meta, KEY_NEXT_USER)?);
            let user = User {
                id,
                name: name.to_string(),
                password_hash: password_hash.to_string(),
                img: img.filter(|i| !i.is_empty()),
            };
            let mut users = txn.open_table(USERS)?;
            put(&mut users, id.0, &user)?;
            names.insert(name, id.0)?;
            user
        };
        txn.commit()?;
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        get_record(&users, id.0)
    }

    pub fn user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(USER_NAMES)?;
        let Some(id) = names.get(name.trim())?.map(|g| g.value()) else {
            return Ok(None);
        };
        let users = txn.open_table(USERS)?;
        get_record(&users, id)
    }

    /// All users by ascending id.
    pub fn users(&self) -> StoreResult<Vec<User>> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        let mut out = Vec::new();
        for entry in users.iter()? {
            let (_, value) = entry?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    pub fn user_count(&self) -> StoreResult<usize> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(USER_NAMES)?;
        count(names.iter()?)
    }

    /// Replace a user's profile picture. `None` or empty removes it.
    pub fn update_user_img(&self, id: UserId, img: Option<String>) -> StoreResult<User> {
        let txn = self.db.begin_write()?;
        let user = {
            let mut users = txn.open_table(USERS)?;
            let mut user: User =
                get_record(&users, id.0)?.ok_or(StoreError::UserNotFound(id))?;
            user.img = img.filter(|i| !i.is_empty());
            put(&mut users, id.0, &user)?;
            user
        };
        txn.commit()?;
        Ok(user)
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Connect two users. Returns the existing connection if the pair is
    /// already connected, in either order.
    pub fn create_connection(&self, a: UserId, b: UserId) -> StoreResult<Connection> {
        if a == b {
            return Err(StoreError::SelfConnection);
        }
        let txn = self.db.begin_write()?;
        let connection = {
            let users = txn.open_table(USERS)?;
            for id in [a, b] {
                if users.get(id.0)?.is_none() {
                    return Err(StoreError::UserNotFound(id));
                }
            }

            let mut index = txn.open_table(USER_CONNECTIONS)?;
            let mut connections = txn.open_table(CONNECTIONS)?;
            let existing = index.get((a.0, b.0))?.map(|g| g.value());
            if let Some(existing) = existing {
                get_record::<Connection>(&connections, existing)?
                    .ok_or(StoreError::ConnectionNotFound(ConnectionId(existing)))?
            } else {
                let mut meta = txn.open_table(META)?;
                let id = ConnectionId(next_id(&mut meta, KEY_NEXT_CONNECTION)?);
                let connection = Connection {
                    id,
                    user_one: a,
                    user_two: b,
                };
                put(&mut connections, id.0, &connection)?;
                index.insert((a.0, b.0), id.0)?;
                index.insert((b.0, a.0), id.0)?;
                connection
            }
        };
        txn.commit()?;
        Ok(connection)
    }

    pub fn connection(&self, id: ConnectionId) -> StoreResult<Option<Connection>> {
        let txn = self.db.begin_read()?;
        let connections = txn.open_table(CONNECTIONS)?;
        get_record(&connections, id.0)
    }

    /// Connections `user` takes part in, by ascending connection id.
    pub fn connections_of(&self, user: UserId) -> StoreResult<Vec<Connection>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(USER_CONNECTIONS)?;
        let connections = txn.open_table(CONNECTIONS)?;

        let mut ids = BTreeSet::new();
        for entry in index.range((user.0, 0)..=(user.0, u64::MAX))? {
            let (_, connection_id) = entry?;
            ids.insert(connection_id.value());
        }
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(connection) = get_record(&connections, id)? {
                out.push(connection);
            }
        }
        Ok(out)
    }

    /// The other participant of each of `user`'s connections.
    pub fn contacts_of(&self, user: UserId) -> StoreResult<Vec<Contact>> {
        let connections = self.connections_of(user)?;
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;

        let mut out = Vec::with_capacity(connections.len());
        for connection in connections {
            let Some(other) = connection.other(user) else {
                continue;
            };
            if let Some(other) = get_record::<User>(&users, other.0)? {
                out.push(Contact {
                    connection_id: connection.id,
                    user_id: other.id,
                    name: other.name,
                    img: other.img,
                });
            }
        }
        Ok(out)
    }

    // =========================================================================
    // MESSAGES
    // =========================================================================

    /// Store a message and mark it unseen for its receiver.
    pub fn create_message(&self, new: NewMessage) -> StoreResult<Message> {
        let new = new.normalized()?;
        let txn = self.db.begin_write()?;
        let message = {
            let connections = txn.open_table(CONNECTIONS)?;
            if connections.get(new.connection_id.0)?.is_none() {
                return Err(StoreError::ConnectionNotFound(new.connection_id));
            }

            let mut meta = txn.open_table(META)?;
            let id = MessageId(next_id(&mut meta, KEY_NEXT_MESSAGE)?);
            let message = Message {
                id,
                text: new.text,
                img: new.img,
                time: new.time,
                connection_id: new.connection_id,
                sender: new.sender,
                receiver: new.receiver,
            };

            let mut messages = txn.open_table(MESSAGES)?;
            put(&mut messages, id.0, &message)?;
            let mut conversation = txn.open_table(CONVERSATION)?;
            conversation.insert((message.connection_id.0, message.time, id.0), ())?;

            if let Some(receiver) = message.receiver {
                let mut unseen = txn.open_table(UNSEEN)?;
                unseen.insert((receiver.0, message.connection_id.0), true)?;
            }
            message
        };
        txn.commit()?;
        Ok(message)
    }

    pub fn message(&self, id: MessageId) -> StoreResult<Option<Message>> {
        let txn = self.db.begin_read()?;
        let messages = txn.open_table(MESSAGES)?;
        get_record(&messages, id.0)
    }

    /// Replace the text of a message. Its time, and so its place in the
    /// conversation, does not change.
    pub fn update_message_text(&self, id: MessageId, text: &str) -> StoreResult<Message> {
        let txn = self.db.begin_write()?;
        let message = {
            let mut messages = txn.open_table(MESSAGES)?;
            let mut message: Message =
                get_record(&messages, id.0)?.ok_or(StoreError::MessageNotFound(id))?;
            message.text = Some(text.to_string()).filter(|t| !t.is_empty());
            put(&mut messages, id.0, &message)?;
            message
        };
        txn.commit()?;
        Ok(message)
    }

    /// One page of a conversation, see [`crate::pagination`].
    ///
    /// `now` (epoch milliseconds) bounds a request without a `before`
    /// cursor, so messages stamped in the future stay out of the first page.
    pub fn message_page(
        &self,
        connection: ConnectionId,
        request: PageRequest,
        now: i64,
    ) -> StoreResult<MessagePage> {
        let txn = self.db.begin_read()?;
        let conversation = txn.open_table(CONVERSATION)?;
        let messages = txn.open_table(MESSAGES)?;

        let c = connection.0;
        let lowest = (c, i64::MIN, 0u64);
        let highest = (c, i64::MAX, u64::MAX);
        let before = request.upper_bound(now);

        let mut newest_first = Vec::with_capacity(request.first);
        for entry in conversation.range(lowest..(c, before, 0u64))?.rev() {
            if newest_first.len() >= request.first {
                break;
            }
            let (key, _) = entry?;
            let (_, _, id) = key.value();
            if let Some(message) = get_record::<Message>(&messages, id)? {
                newest_first.push(message);
            }
        }

        let has_previous_page = match newest_first.last() {
            Some(oldest) => conversation
                .range(lowest..(c, oldest.time, 0u64))?
                .next()
                .transpose()?
                .is_some(),
            None => false,
        };
        let has_next_page = conversation
            .range((c, before, 0u64)..=highest)?
            .next()
            .transpose()?
            .is_some();
        let total_count = count(conversation.range(lowest..=highest)?)?;

        Ok(MessagePage::assemble(
            newest_first,
            has_previous_page,
            has_next_page,
            total_count,
        ))
    }

    pub fn message_count(&self, connection: ConnectionId) -> StoreResult<usize> {
        let txn = self.db.begin_read()?;
        let conversation = txn.open_table(CONVERSATION)?;
        let c = connection.0;
        count(conversation.range((c, i64::MIN, 0u64)..=(c, i64::MAX, u64::MAX))?)
    }

    /// Delete every message of a conversation. Returns how many were removed.
    pub fn delete_messages_in(&self, connection: ConnectionId) -> StoreResult<usize> {
        let txn = self.db.begin_write()?;
        let deleted = delete_conversation(&txn, connection)?;
        txn.commit()?;
        Ok(deleted)
    }

    // =========================================================================
    // UNSEEN FLAGS
    // =========================================================================

    /// Set the unread state of a conversation for a user, creating the flag
    /// if needed.
    pub fn set_unseen(
        &self,
        user: UserId,
        connection: ConnectionId,
        unseen: bool,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let connections = txn.open_table(CONNECTIONS)?;
            if connections.get(connection.0)?.is_none() {
                return Err(StoreError::ConnectionNotFound(connection));
            }
            let mut flags = txn.open_table(UNSEEN)?;
            flags.insert((user.0, connection.0), unseen)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Unread states of all conversations a user has a flag for.
    pub fn unseen_flags(&self, user: UserId) -> StoreResult<Vec<UnseenFlag>> {
        let txn = self.db.begin_read()?;
        let flags = txn.open_table(UNSEEN)?;
        let mut out = Vec::new();
        for entry in flags.range((user.0, 0)..=(user.0, u64::MAX))? {
            let (key, unseen) = entry?;
            let (_, connection_id) = key.value();
            out.push(UnseenFlag {
                connection_id: ConnectionId(connection_id),
                unseen: unseen.value(),
            });
        }
        Ok(out)
    }

    // =========================================================================
    // PUSH SUBSCRIPTIONS
    // =========================================================================

    /// The user's subscription stored with exactly this JSON.
    pub fn find_subscription(
        &self,
        user: UserId,
        sub_obj: &str,
    ) -> StoreResult<Option<PushSubscription>> {
        Ok(self
            .subscriptions_of(user)?
            .into_iter()
            .find(|s| s.sub_obj == sub_obj))
    }

    /// Store a subscription, or re-activate it if already stored.
    ///
    /// The lookup runs inside the write transaction, so concurrent
    /// registrations of the same JSON leave a single row.
    pub fn register_subscription(
        &self,
        user: UserId,
        sub_obj: &str,
    ) -> StoreResult<PushSubscription> {
        let txn = self.db.begin_write()?;
        let sub = {
            let users = txn.open_table(USERS)?;
            if users.get(user.0)?.is_none() {
                return Err(StoreError::UserNotFound(user));
            }
            let mut subs = txn.open_table(SUBSCRIPTIONS)?;
            let mut index = txn.open_table(USER_SUBS)?;
            let existing = collect_subscriptions(&index, &subs, user)?
                .into_iter()
                .find(|s| s.sub_obj == sub_obj);
            match existing {
                Some(mut sub) => {
                    sub.active = true;
                    put(&mut subs, sub.sub_id.0, &sub)?;
                    sub
                }
                None => {
                    let mut meta = txn.open_table(META)?;
                    let sub_id = SubscriptionId(next_id(&mut meta, KEY_NEXT_SUBSCRIPTION)?);
                    let sub = PushSubscription {
                        sub_id,
                        user_id: user,
                        sub_obj: sub_obj.to_string(),
                        active: true,
                    };
                    put(&mut subs, sub_id.0, &sub)?;
                    index.insert((user.0, sub_id.0), ())?;
                    sub
                }
            }
        };
        txn.commit()?;
        Ok(sub)
    }

    /// Deactivate the user's subscription carrying the same `keys.auth` as
    /// `sub_obj`. Returns whether one was found.
    pub fn deactivate_subscription(&self, user: UserId, sub_obj: &str) -> StoreResult<bool> {
        let auth = auth_key(sub_obj)?;
        let txn = self.db.begin_write()?;
        let found = {
            let mut subs = txn.open_table(SUBSCRIPTIONS)?;
            let index = txn.open_table(USER_SUBS)?;
            let found = collect_subscriptions(&index, &subs, user)?
                .into_iter()
                .find(|s| auth_key(&s.sub_obj).is_ok_and(|a| a == auth));
            match found {
                Some(mut sub) => {
                    sub.active = false;
                    put(&mut subs, sub.sub_id.0, &sub)?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(found)
    }

    /// All subscriptions of a user, active or not.
    pub fn subscriptions_of(&self, user: UserId) -> StoreResult<Vec<PushSubscription>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(USER_SUBS)?;
        let subs = txn.open_table(SUBSCRIPTIONS)?;
        collect_subscriptions(&index, &subs, user)
    }

    /// Forget a subscription the push service no longer accepts.
    pub fn remove_subscription(&self, id: SubscriptionId) -> StoreResult<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut subs = txn.open_table(SUBSCRIPTIONS)?;
            let sub: Option<PushSubscription> = get_record(&subs, id.0)?;
            match sub {
                Some(sub) => {
                    subs.remove(id.0)?;
                    let mut index = txn.open_table(USER_SUBS)?;
                    index.remove((sub.user_id.0, id.0))?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(removed)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Size of the database file; 0 for an in-memory store.
    pub fn size_bytes(&self) -> StoreResult<u64> {
        match &self.path {
            Some(path) => Ok(std::fs::metadata(path)?.len()),
            None => Ok(0),
        }
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let txn = self.db.begin_read()?;
        Ok(StoreStats {
            users: count(txn.open_table(USERS)?.iter()?)?,
            connections: count(txn.open_table(CONNECTIONS)?.iter()?)?,
            messages: count(txn.open_table(MESSAGES)?.iter()?)?,
            subscriptions: count(txn.open_table(SUBSCRIPTIONS)?.iter()?)?,
            size_bytes: self.size_bytes()?,
        })
    }

    /// When the database has grown to `limit_bytes`, delete the messages of
    /// every conversation in which nobody has anything unread.
    pub fn cleanup(&self, limit_bytes: u64) -> StoreResult<CleanupOutcome> {
        let size_bytes = self.size_bytes()?;
        let mut outcome = CleanupOutcome {
            performed: false,
            size_bytes,
            limit_bytes,
            messages_deleted: 0,
        };
        if size_bytes < limit_bytes {
            return Ok(outcome);
        }

        let txn = self.db.begin_write()?;
        {
            let mut pending = BTreeSet::new();
            let flags = txn.open_table(UNSEEN)?;
            for entry in flags.iter()? {
                let (key, unseen) = entry?;
                if unseen.value() {
                    pending.insert(key.value().1);
                }
            }
            drop(flags);

            let mut seen_connections = Vec::new();
            let connections = txn.open_table(CONNECTIONS)?;
            for entry in connections.iter()? {
                let (id, _) = entry?;
                if !pending.contains(&id.value()) {
                    seen_connections.push(ConnectionId(id.value()));
                }
            }
            drop(connections);

            for connection in seen_connections {
                outcome.messages_deleted += delete_conversation(&txn, connection)?;
            }
        }
        txn.commit()?;
        outcome.performed = true;
        Ok(outcome)
    }

    /// Wipe the conversation of the shared visitor account. Returns the
    /// cleared connection, if the visitor exists and has one.
    pub fn clear_visitor(&self, visitor_name: &str) -> StoreResult<Option<ConnectionId>> {
        let Some(visitor) = self.user_by_name(visitor_name)? else {
            return Ok(None);
        };
        let Some(connection) = self.connections_of(visitor.id)?.into_iter().next() else {
            return Ok(None);
        };
        self.delete_messages_in(connection.id)?;
        Ok(Some(connection.id))
    }

    /// Empty every table and restart the id counters.
    pub fn clear(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(META)?;
        txn.delete_table(USER_NAMES)?;
        txn.delete_table(USER_CONNECTIONS)?;
        txn.delete_table(CONVERSATION)?;
        txn.delete_table(UNSEEN)?;
        txn.delete_table(USER_SUBS)?;
        txn.delete_table(USERS)?;
        txn.delete_table(CONNECTIONS)?;
        txn.delete_table(MESSAGES)?;
        txn.delete_table(SUBSCRIPTIONS)?;
        create_tables(&txn)?;
        {
            let mut meta = txn.open_table(META)?;
            meta.insert(KEY_SCHEMA_VERSION, SCHEMA_VERSION)?;
        }
        txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn create_tables(txn: &WriteTransaction) -> StoreResult<()> {
    txn.open_table(META)?;
    txn.open_table(USER_NAMES)?;
    txn.open_table(USER_CONNECTIONS)?;
    txn.open_table(CONVERSATION)?;
    txn.open_table(UNSEEN)?;
    txn.open_table(USER_SUBS)?;
    txn.open_table(USERS)?;
    txn.open_table(CONNECTIONS)?;
    txn.open_table(MESSAGES)?;
    txn.open_table(SUBSCRIPTIONS)?;
    Ok(())
}

/// Version 1 databases lack the per-user subscription index.
fn rebuild_user_subs(txn: &WriteTransaction) -> StoreResult<()> {
    let subs = txn.open_table(SUBSCRIPTIONS)?;
    let mut index = txn.open_table(USER_SUBS)?;
    for entry in subs.iter()? {
        let (_, value) = entry?;
        let sub: PushSubscription = decode(value.value())?;
        index.insert((sub.user_id.0, sub.sub_id.0), ())?;
    }
    Ok(())
}

fn delete_conversation(txn: &WriteTransaction, connection: ConnectionId) -> StoreResult<usize> {
    let c = connection.0;
    let mut conversation = txn.open_table(CONVERSATION)?;
    let mut keys = Vec::new();
    for entry in conversation.range((c, i64::MIN, 0u64)..=(c, i64::MAX, u64::MAX))? {
        let (key, _) = entry?;
        keys.push(key.value());
    }

    let mut messages = txn.open_table(MESSAGES)?;
    for key in &keys {
        conversation.remove(*key)?;
        messages.remove(key.2)?;
    }
    Ok(keys.len())
}

fn next_id(meta: &mut Table<'_, &'static str, u64>, key: &str) -> StoreResult<u64> {
    let current = meta.get(key)?.map(|g| g.value()).unwrap_or(0);
    let next = current.saturating_add(1);
    meta.insert(key, next)?;
    Ok(next)
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(postcard::from_bytes(bytes)?)
}

fn put<T: Serialize>(table: &mut RecordTable<'_>, id: u64, value: &T) -> StoreResult<()> {
    let bytes = encode(value)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

fn get_record<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> StoreResult<Option<T>> {
    match table.get(id)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

fn collect_subscriptions(
    index: &impl ReadableTable<(u64, u64), ()>,
    subs: &impl ReadableTable<u64, &'static [u8]>,
    user: UserId,
) -> StoreResult<Vec<PushSubscription>> {
    let mut out = Vec::new();
    for entry in index.range((user.0, 0)..=(user.0, u64::MAX))? {
        let (key, _) = entry?;
        let (_, sub_id) = key.value();
        if let Some(sub) = get_record(subs, sub_id)? {
            out.push(sub);
        }
    }
    Ok(out)
}

fn count<I, T>(iter: I) -> StoreResult<usize>
where
    I: Iterator<Item = Result<T, redb::StorageError>>,
{
    let mut n = 0usize;
    for entry in iter {
        entry?;
        n += 1;
    }
    Ok(n)
}
