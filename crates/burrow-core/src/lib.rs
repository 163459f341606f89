//! Burrow Core: byte-ordered embedded storage engine
//!
//! An ordered key-value engine where RAM holds the working table and a
//! write-ahead log provides crash safety.
//!
//! # Architecture
//!
//! - **Read path**: served from an in-RAM `BTreeMap` behind a read lock
//! - **Write path**: WAL first (synced or not, per call), then RAM
//! - **Cursors**: pin a copy-on-write snapshot of the table, bounded by an
//!   inclusive lower and exclusive upper key
//! - **Batches**: one WAL record with one checksum, applied under one lock
//!
//! The crate knows nothing about key/value validity rules or default
//! durability policy; those belong to the store layer in `burrow-db`.

pub mod config;
pub mod cursor;
pub mod durability;
pub mod engine;
pub mod error;
pub mod format;
pub mod memtable;
pub mod wal;

pub use config::Config;
pub use cursor::Cursor;
pub use durability::Durability;
pub use engine::{Engine, EngineStats};
pub use error::{EngineError, EngineResult};
pub use format::BatchOp;
pub use memtable::MemTable;
pub use wal::{WalReader, WalRecovery, WalWriter};
