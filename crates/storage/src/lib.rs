//! Storage abstraction and implementations for pathways.
//!
//! This crate provides a trait-based storage interface with an in-memory
//! backend, a JSON file backend and an optional SQLite backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory_storage;
pub mod json_storage;

#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{CasOutcome, PathwayStore, StorageError, Result};
pub use memory_storage::MemoryStorage;
pub use json_storage::JsonStorage;

#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
