//! Storage abstraction and implementations for Skillpath.
//!
//! This crate provides the trait-based persistence and content-catalog
//! interfaces the planner depends on, with an in-memory and a JSON-file
//! implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;
pub mod json_storage;

pub use trait_::{Storage, ContentCatalog, StorageError, Result, MasteryKey, RECENT_ACTIVITY_LIMIT};
pub use memory::MemoryStorage;
pub use json_storage::JsonStorage;
