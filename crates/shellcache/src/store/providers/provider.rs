//! # Generation Store
//!
//! This module defines the store trait that all generation-backed cache
//! implementations must follow.

use async_trait::async_trait;

use crate::store::types::{RequestKey, StoreResult, StoredResponse};

/// A trait for stores that keep request/response pairs grouped into named,
/// independently deletable generations.
///
/// The set of generations is process-wide: clones or `Arc`-shared handles of
/// a store observe each other's writes immediately.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Open the named generation, creating it if absent
    async fn open(&self, generation: &str) -> StoreResult<()>;

    /// List the names of all existing generations
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// Delete a generation and all of its entries.
    ///
    /// Returns `true` if the generation existed.
    async fn delete(&self, generation: &str) -> StoreResult<bool>;

    /// Check whether a generation contains an entry for the given key
    async fn contains(&self, generation: &str, key: &RequestKey) -> StoreResult<bool>;

    /// Get an entry from a specific generation
    async fn get(&self, generation: &str, key: &RequestKey) -> StoreResult<Option<StoredResponse>>;

    /// Put an entry into a generation, creating the generation if absent.
    ///
    /// Overwrites any existing entry for the same key.
    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> StoreResult<()>;

    /// Look up a key across every generation still present.
    ///
    /// In steady state only the current generation exists, but entries left
    /// behind in a not-yet-deleted generation are still served.
    async fn match_any(&self, key: &RequestKey) -> StoreResult<Option<StoredResponse>> {
        for generation in self.list().await? {
            if let Some(response) = self.get(&generation, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
