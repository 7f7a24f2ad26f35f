//! Integration tests for the redb chat store.
//!
//! Uses tempfile for file-backed databases.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use rtcchat_core::{
    ConnectionId, MessageId, NewMessage, PageRequest, Store, StoreError, UserId, ValidationError,
};
use std::sync::Barrier;
use std::thread;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Wall clock handed to paging; later than every message time used here.
const NOW: i64 = 1_700_000_000_000;

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Two connected users, alice and bob.
fn chat_pair(store: &Store) -> (UserId, UserId, ConnectionId) {
    let alice = store.create_user("alice", "hash-a", None).unwrap();
    let bob = store.create_user("bob", "hash-b", None).unwrap();
    let connection = store.create_connection(alice.id, bob.id).unwrap();
    (alice.id, bob.id, connection.id)
}

fn text(connection: ConnectionId, sender: UserId, receiver: UserId, time: i64) -> NewMessage {
    NewMessage {
        text: Some(format!("at {time}")),
        img: None,
        time,
        connection_id: connection,
        sender,
        receiver: Some(receiver),
    }
}

const SUB_A: &str = r#"{"endpoint":"https://push.example.com/a","expirationTime":null,"keys":{"p256dh":"BPa","auth":"auth-a"}}"#;
const SUB_A_REORDERED: &str = r#"{"keys":{"auth":"auth-a","p256dh":"BPa"},"endpoint":"https://push.example.com/a"}"#;
const SUB_B: &str = r#"{"endpoint":"https://push.example.com/b","expirationTime":null,"keys":{"p256dh":"BPb","auth":"auth-b"}}"#;

// =============================================================================
// USER TESTS
// =============================================================================

#[test]
fn test_create_and_find_users() {
    let store = Store::open_in_memory().unwrap();
    let alice = store.create_user("alice", "hash", Some("data:img".into())).unwrap();

    assert_eq!(alice.id, UserId(1));
    assert_eq!(store.user(alice.id).unwrap(), Some(alice.clone()));
    assert_eq!(store.user_by_name("alice").unwrap(), Some(alice.clone()));
    assert_eq!(store.user_by_name("nobody").unwrap(), None);
    assert_eq!(store.user_count().unwrap(), 1);
}

#[test]
fn test_duplicate_name_rejected() {
    let store = Store::open_in_memory().unwrap();
    store.create_user("alice", "hash", None).unwrap();
    let result = store.create_user("alice", "other", None);
    assert!(matches!(result, Err(StoreError::NameTaken(name)) if name == "alice"));
    assert_eq!(store.user_count().unwrap(), 1);
}

#[test]
fn test_update_user_img() {
    let store = Store::open_in_memory().unwrap();
    let alice = store.create_user("alice", "hash", None).unwrap();

    let updated = store
        .update_user_img(alice.id, Some("data:new".into()))
        .unwrap();
    assert_eq!(updated.img.as_deref(), Some("data:new"));

    let cleared = store.update_user_img(alice.id, Some(String::new())).unwrap();
    assert_eq!(cleared.img, None);

    assert!(matches!(
        store.update_user_img(UserId(99), None),
        Err(StoreError::UserNotFound(UserId(99)))
    ));
}

// =============================================================================
// CONNECTION TESTS
// =============================================================================

#[test]
fn test_contacts_see_the_other_side() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    let carol = store.create_user("carol", "hash", None).unwrap();
    let second = store.create_connection(carol.id, alice).unwrap();

    let contacts = store.contacts_of(alice).unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].connection_id, connection);
    assert_eq!(contacts[0].user_id, bob);
    assert_eq!(contacts[0].name, "bob");
    assert_eq!(contacts[1].connection_id, second.id);
    assert_eq!(contacts[1].name, "carol");

    let bobs = store.contacts_of(bob).unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].user_id, alice);
}

#[test]
fn test_self_connection_rejected() {
    let store = Store::open_in_memory().unwrap();
    let alice = store.create_user("alice", "hash", None).unwrap();
    assert!(matches!(
        store.create_connection(alice.id, alice.id),
        Err(StoreError::SelfConnection)
    ));
}

#[test]
fn test_connection_requires_existing_users() {
    let store = Store::open_in_memory().unwrap();
    let alice = store.create_user("alice", "hash", None).unwrap();
    assert!(matches!(
        store.create_connection(alice.id, UserId(42)),
        Err(StoreError::UserNotFound(UserId(42)))
    ));
}

// =============================================================================
// MESSAGE AND PAGINATION TESTS
// =============================================================================

#[test]
fn test_message_marks_receiver_unseen() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);

    store
        .create_message(text(connection, alice, bob, 1_000))
        .unwrap();

    let flags = store.unseen_flags(bob).unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].connection_id, connection);
    assert!(flags[0].unseen);
    assert!(store.unseen_flags(alice).unwrap().is_empty());

    store.set_unseen(bob, connection, false).unwrap();
    assert!(!store.unseen_flags(bob).unwrap()[0].unseen);
}

#[test]
fn test_message_requires_connection() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, _) = chat_pair(&store);
    let result = store.create_message(text(ConnectionId(77), alice, bob, 1));
    assert!(matches!(
        result,
        Err(StoreError::ConnectionNotFound(ConnectionId(77)))
    ));
}

#[test]
fn test_empty_message_rejected() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    let mut empty = text(connection, alice, bob, 1);
    empty.text = None;
    assert!(matches!(
        store.create_message(empty),
        Err(StoreError::Invalid(ValidationError::EmptyMessage))
    ));
}

#[test]
fn test_pages_walk_backwards() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    for i in 1..=25 {
        store
            .create_message(text(connection, alice, bob, 1_694_500_000_000 + i))
            .unwrap();
    }

    let newest = store
        .message_page(connection, PageRequest::default(), NOW)
        .unwrap();
    assert_eq!(newest.total_count, 25);
    assert_eq!(newest.edges.len(), 10);
    assert!(newest.page_info.has_previous_page);
    assert!(!newest.page_info.has_next_page);
    let times: Vec<i64> = newest.messages().map(|m| m.time).collect();
    assert_eq!(times.first(), Some(&1_694_500_000_016));
    assert_eq!(times.last(), Some(&1_694_500_000_025));

    let older = store
        .message_page(
            connection,
            PageRequest::from_args(Some(10), newest.page_info.end_cursor.as_deref()).unwrap(),
            NOW,
        )
        .unwrap();
    assert_eq!(older.edges.len(), 10);
    assert!(older.page_info.has_previous_page);
    assert!(older.page_info.has_next_page);
    assert_eq!(
        older.page_info.start_cursor.as_deref(),
        Some("1694500000015")
    );

    let oldest = store
        .message_page(
            connection,
            PageRequest::from_args(Some(10), older.page_info.end_cursor.as_deref()).unwrap(),
            NOW,
        )
        .unwrap();
    assert_eq!(oldest.edges.len(), 5);
    assert!(!oldest.page_info.has_previous_page);
    assert_eq!(oldest.edges[0].node.time, 1_694_500_000_001);
}

#[test]
fn test_pages_are_per_connection() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    let carol = store.create_user("carol", "hash", None).unwrap();
    let other = store.create_connection(alice, carol.id).unwrap();

    store.create_message(text(connection, alice, bob, 10)).unwrap();
    store.create_message(text(other.id, alice, carol.id, 20)).unwrap();

    let page = store
        .message_page(connection, PageRequest::default(), NOW)
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.edges[0].node.time, 10);
    assert_eq!(store.message_count(other.id).unwrap(), 1);
}

#[test]
fn test_first_page_ends_at_now() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    store.create_message(text(connection, alice, bob, NOW - 10)).unwrap();
    store.create_message(text(connection, alice, bob, NOW + 60_000)).unwrap();

    let page = store
        .message_page(connection, PageRequest::default(), NOW)
        .unwrap();
    let times: Vec<i64> = page.messages().map(|m| m.time).collect();
    assert_eq!(times, vec![NOW - 10]);
    assert!(page.page_info.has_next_page);
    assert_eq!(page.total_count, 2);
}

#[test]
fn test_edit_keeps_position() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    let first = store.create_message(text(connection, alice, bob, 10)).unwrap();
    store.create_message(text(connection, alice, bob, 20)).unwrap();

    let edited = store.update_message_text(first.id, "fixed").unwrap();
    assert_eq!(edited.text.as_deref(), Some("fixed"));
    assert_eq!(edited.time, 10);

    let page = store
        .message_page(connection, PageRequest::default(), NOW)
        .unwrap();
    assert_eq!(page.edges[0].node.text.as_deref(), Some("fixed"));
    assert!(matches!(
        store.update_message_text(MessageId(99), "x"),
        Err(StoreError::MessageNotFound(MessageId(99)))
    ));
}

// =============================================================================
// PUSH SUBSCRIPTION TESTS
// =============================================================================

#[test]
fn test_register_is_idempotent() {
    let store = Store::open_in_memory().unwrap();
    let (alice, _, _) = chat_pair(&store);

    let first = store.register_subscription(alice, SUB_A).unwrap();
    let again = store.register_subscription(alice, SUB_A).unwrap();
    assert_eq!(first.sub_id, again.sub_id);
    assert!(again.active);
    assert_eq!(store.subscriptions_of(alice).unwrap().len(), 1);

    store.register_subscription(alice, SUB_B).unwrap();
    assert_eq!(store.subscriptions_of(alice).unwrap().len(), 2);
}

#[test]
fn test_deactivate_matches_auth_key() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, _) = chat_pair(&store);
    store.register_subscription(alice, SUB_A).unwrap();

    // Same browser subscription serialized differently.
    assert!(store.deactivate_subscription(alice, SUB_A_REORDERED).unwrap());
    let sub = store.find_subscription(alice, SUB_A).unwrap().unwrap();
    assert!(!sub.active);

    // Other users' subscriptions are out of reach.
    assert!(!store.deactivate_subscription(bob, SUB_A).unwrap());

    // Registering again re-activates.
    assert!(store.register_subscription(alice, SUB_A).unwrap().active);
}

#[test]
fn test_concurrent_register_stores_one_row() {
    let store = Store::open_in_memory().unwrap();
    let (alice, _, _) = chat_pair(&store);

    for _ in 0..20 {
        let barrier = Barrier::new(8);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    store.register_subscription(alice, SUB_A).unwrap();
                });
            }
        });
        assert_eq!(store.subscriptions_of(alice).unwrap().len(), 1);
    }
    assert_eq!(store.stats().unwrap().subscriptions, 1);
}

#[test]
fn test_deactivate_racing_remove_leaves_no_orphan() {
    let store = Store::open_in_memory().unwrap();
    let (alice, _, _) = chat_pair(&store);

    for _ in 0..20 {
        let sub = store.register_subscription(alice, SUB_A).unwrap();
        let barrier = Barrier::new(2);
        thread::scope(|s| {
            s.spawn(|| {
                barrier.wait();
                store.deactivate_subscription(alice, SUB_A).unwrap();
            });
            s.spawn(|| {
                barrier.wait();
                store.remove_subscription(sub.sub_id).unwrap();
            });
        });
        assert!(store.subscriptions_of(alice).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().subscriptions, 0);
    }
}

#[test]
fn test_remove_subscription() {
    let store = Store::open_in_memory().unwrap();
    let (alice, _, _) = chat_pair(&store);
    let sub = store.register_subscription(alice, SUB_A).unwrap();

    assert!(store.remove_subscription(sub.sub_id).unwrap());
    assert!(!store.remove_subscription(sub.sub_id).unwrap());
    assert!(store.find_subscription(alice, SUB_A).unwrap().is_none());
}

// =============================================================================
// MAINTENANCE TESTS
// =============================================================================

#[test]
fn test_cleanup_keeps_conversations_with_unseen_messages() {
    let temp = create_temp_dir();
    let store = Store::open(temp.path().join("chat.redb")).unwrap();
    let (alice, bob, seen) = chat_pair(&store);
    let carol = store.create_user("carol", "hash", None).unwrap();
    let pending = store.create_connection(alice, carol.id).unwrap();

    store.create_message(text(seen, alice, bob, 1)).unwrap();
    store.create_message(text(seen, bob, alice, 2)).unwrap();
    store.set_unseen(bob, seen, false).unwrap();
    store.set_unseen(alice, seen, false).unwrap();
    store.create_message(text(pending.id, alice, carol.id, 3)).unwrap();

    let skipped = store.cleanup(u64::MAX).unwrap();
    assert!(!skipped.performed);
    assert_eq!(store.message_count(seen).unwrap(), 2);

    let outcome = store.cleanup(0).unwrap();
    assert!(outcome.performed);
    assert_eq!(outcome.messages_deleted, 2);
    assert_eq!(store.message_count(seen).unwrap(), 0);
    assert_eq!(store.message_count(pending.id).unwrap(), 1);
}

#[test]
fn test_clear_visitor() {
    let store = Store::open_in_memory().unwrap();
    let admin = store.create_user("admin", "hash", None).unwrap();
    let visitor = store.create_user("Visitor", "hash", None).unwrap();
    let connection = store.create_connection(admin.id, visitor.id).unwrap();
    store
        .create_message(text(connection.id, visitor.id, admin.id, 5))
        .unwrap();

    assert_eq!(store.clear_visitor("Visitor").unwrap(), Some(connection.id));
    assert_eq!(store.message_count(connection.id).unwrap(), 0);
    assert_eq!(store.clear_visitor("Nobody").unwrap(), None);
}

#[test]
fn test_data_survives_reopen() {
    let temp = create_temp_dir();
    let path = temp.path().join("nested").join("chat.redb");
    {
        let store = Store::open(&path).unwrap();
        let (alice, bob, connection) = chat_pair(&store);
        store.create_message(text(connection, alice, bob, 7)).unwrap();
    }

    let store = Store::open(&path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.users, 2);
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.messages, 1);
    assert!(stats.size_bytes > 0);

    // Counters continue where they left off.
    let carol = store.create_user("carol", "hash", None).unwrap();
    assert_eq!(carol.id, UserId(3));
}

#[test]
fn test_clear_empties_everything() {
    let store = Store::open_in_memory().unwrap();
    let (alice, bob, connection) = chat_pair(&store);
    store.create_message(text(connection, alice, bob, 7)).unwrap();
    store.register_subscription(alice, SUB_A).unwrap();

    store.clear().unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.users, 0);
    assert_eq!(stats.connections, 0);
    assert_eq!(stats.messages, 0);
    assert_eq!(stats.subscriptions, 0);
    assert!(store.unseen_flags(bob).unwrap().is_empty());
}
