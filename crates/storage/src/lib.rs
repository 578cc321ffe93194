//! History storage for portdq.
//!
//! This crate provides an append-only [`HistoryStore`] interface with a JSON
//! file reference implementation, an in-memory store, and an optional SQLite
//! backend (feature `sqlite`).

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{HistoryStore, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory_storage::MemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
