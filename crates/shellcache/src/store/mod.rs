//! # Generation Store
//!
//! This module provides the durable request/response store used by the cache
//! controller: a process-wide set of named generations, each owning its
//! entries, with memory- and file-backed providers.

// Module declarations
pub mod providers;
mod types;

// Re-export primary types from our various modules
pub use types::{Request, RequestKey, Served, ServedFrom, StoreResult, StoredResponse};

pub use providers::{FileStore, GenerationStore, MemoryStore};
