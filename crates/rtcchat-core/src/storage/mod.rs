//! # Storage Module
//!
//! Persistent chat storage using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded; secondary indexes are composite keys so
//! that every lookup the server performs is a range scan.

mod redb_store;
mod tables;

pub use redb_store::{CleanupOutcome, Store, StoreStats};
pub use tables::SCHEMA_VERSION;
