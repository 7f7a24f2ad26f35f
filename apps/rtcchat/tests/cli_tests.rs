//! Integration tests for RTCChat CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use rtcchat::cli::{
    Cli, Commands, cmd_cleanup, cmd_create_user, cmd_init, cmd_status,
};
use rtcchat::config::Environment;
use rtcchat_core::{NewMessage, Store};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("chat.redb")
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_database() {
    let temp = create_temp_dir();
    let path = db_path(&temp);

    assert!(cmd_init(&path, false).is_ok());
    assert!(path.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let path = db_path(&temp);

    cmd_init(&path, false).unwrap();
    assert!(cmd_init(&path, false).is_err());
}

#[test]
fn test_init_with_force_starts_empty() {
    let temp = create_temp_dir();
    let path = db_path(&temp);

    cmd_init(&path, false).unwrap();
    {
        let store = Store::open(&path).unwrap();
        store.create_user("alice", "hash", None).unwrap();
    }
    cmd_init(&path, true).unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.user_count().unwrap(), 0);
}

// =============================================================================
// STATUS COMMAND TESTS
// =============================================================================

#[test]
fn test_status_on_existing_database() {
    let temp = create_temp_dir();
    let path = db_path(&temp);
    cmd_init(&path, false).unwrap();

    assert!(cmd_status(&path, false).is_ok());
    assert!(cmd_status(&path, true).is_ok());
}

#[test]
fn test_status_missing_database_fails() {
    let temp = create_temp_dir();
    assert!(cmd_status(&db_path(&temp), false).is_err());
}

// =============================================================================
// CLEANUP COMMAND TESTS
// =============================================================================

#[test]
fn test_cleanup_below_limit_keeps_messages() {
    let temp = create_temp_dir();
    let path = db_path(&temp);
    seed_conversation(&path, false);

    cmd_cleanup(&path, None, Environment::Production).unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.stats().unwrap().messages, 2);
}

#[test]
fn test_cleanup_zero_limit_removes_read_conversations() {
    let temp = create_temp_dir();
    let path = db_path(&temp);
    seed_conversation(&path, false);

    cmd_cleanup(&path, Some(0), Environment::Production).unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.stats().unwrap().messages, 0);
}

#[test]
fn test_cleanup_keeps_unread_conversations() {
    let temp = create_temp_dir();
    let path = db_path(&temp);
    seed_conversation(&path, true);

    cmd_cleanup(&path, Some(0), Environment::Production).unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.stats().unwrap().messages, 2);
}

/// Two messages between alice and bob; bob's unread flag left as given.
fn seed_conversation(path: &std::path::Path, unread: bool) {
    let store = Store::open(path).unwrap();
    let alice = store.create_user("alice", "h", None).unwrap();
    let bob = store.create_user("bob", "h", None).unwrap();
    let connection = store.create_connection(alice.id, bob.id).unwrap();
    for time in [1, 2] {
        store
            .create_message(NewMessage {
                text: Some(format!("m{time}")),
                img: None,
                time,
                connection_id: connection.id,
                sender: alice.id,
                receiver: Some(bob.id),
            })
            .unwrap();
    }
    store.set_unseen(bob.id, connection.id, unread).unwrap();
}

// =============================================================================
// CREATE-USER COMMAND TESTS
// =============================================================================

#[tokio::test]
async fn test_create_user_registers_account() {
    let temp = create_temp_dir();
    let path = db_path(&temp);

    cmd_create_user(&path, "  alice ", "secret").await.unwrap();

    let store = Store::open(&path).unwrap();
    let user = store.user_by_name("alice").unwrap().unwrap();
    assert!(bcrypt::verify("secret", &user.password_hash).unwrap());
}

#[tokio::test]
async fn test_create_user_rejects_duplicates_and_blanks() {
    let temp = create_temp_dir();
    let path = db_path(&temp);

    cmd_create_user(&path, "alice", "secret").await.unwrap();
    assert!(cmd_create_user(&path, "alice", "other").await.is_err());
    assert!(cmd_create_user(&path, "bob", "").await.is_err());
}

// =============================================================================
// ARGUMENT PARSING TESTS
// =============================================================================

#[test]
fn test_parse_serve_arguments() {
    let cli = Cli::try_parse_from([
        "rtcchat",
        "--database",
        "/tmp/x.redb",
        "serve",
        "--token-secret",
        "0123456789abcdef",
        "--env",
        "test",
        "--admins",
        "root, ops",
        "--login-rate",
        "5",
    ])
    .unwrap();
    assert_eq!(cli.database, PathBuf::from("/tmp/x.redb"));
    let Commands::Serve(args) = cli.command else {
        panic!("expected serve");
    };
    let config = args.into_config();
    assert_eq!(config.environment, Environment::Test);
    assert_eq!(config.admins, vec!["root", "ops"]);
    assert_eq!(config.login_rate_per_minute, 5);
    assert!(config.vapid.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_rejects_unknown_environment() {
    let result = Cli::try_parse_from([
        "rtcchat",
        "serve",
        "--token-secret",
        "0123456789abcdef",
        "--env",
        "staging",
    ]);
    assert!(result.is_err());
}
