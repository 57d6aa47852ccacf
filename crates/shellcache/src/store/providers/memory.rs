//! # Memory Store Provider
//!
//! This module provides an in-memory generation store backed by Moka caches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::store::providers::GenerationStore;
use crate::store::types::{RequestKey, StoreResult, StoredResponse};

type GenerationCache = MokaCache<RequestKey, StoredResponse>;

/// In-memory generation store.
///
/// Each generation is its own Moka cache, weighed by response body size and
/// capped at `max_bytes`. Entries carry no TTL; they live until their
/// generation is deleted. Clones share the same underlying generation map,
/// so every handle observes every other handle's writes.
#[derive(Clone)]
pub struct MemoryStore {
    generations: Arc<RwLock<HashMap<String, GenerationCache>>>,
    /// Maximum size of a single generation in bytes
    max_bytes: u64,
}

impl MemoryStore {
    /// Create a new memory store with the specified per-generation size limit
    pub fn new(max_bytes: u64) -> Self {
        if max_bytes == 0 {
            panic!("Memory store size must be greater than zero");
        }

        debug!(max_bytes, "Memory store created with size limit");

        Self {
            generations: Arc::new(RwLock::new(HashMap::new())),
            max_bytes,
        }
    }

    fn build_generation(&self) -> GenerationCache {
        // Size based eviction only; entries never expire on their own
        MokaCache::builder()
            .weigher(|_k, v: &StoredResponse| v.body.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(self.max_bytes)
            .build()
    }

    /// Clone the handle for a generation's cache, if it exists
    fn generation(&self, name: &str) -> Option<GenerationCache> {
        self.generations.read().get(name).cloned()
    }

    /// Clone the handle for a generation's cache, creating it if absent
    fn generation_or_create(&self, name: &str) -> GenerationCache {
        if let Some(cache) = self.generation(name) {
            return cache;
        }

        let mut generations = self.generations.write();
        generations
            .entry(name.to_string())
            .or_insert_with(|| self.build_generation())
            .clone()
    }

    /// Settle Moka's pending maintenance for a generation
    #[cfg(test)]
    pub(crate) async fn run_pending_tasks(&self, name: &str) {
        if let Some(cache) = self.generation(name) {
            cache.run_pending_tasks().await;
        }
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn open(&self, generation: &str) -> StoreResult<()> {
        self.generation_or_create(generation);
        debug!(generation, "Opened memory generation");
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.generations.read().keys().cloned().collect())
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        let removed = self.generations.write().remove(generation).is_some();
        if removed {
            debug!(generation, "Deleted memory generation");
        }
        Ok(removed)
    }

    async fn contains(&self, generation: &str, key: &RequestKey) -> StoreResult<bool> {
        match self.generation(generation) {
            Some(cache) => Ok(cache.contains_key(key)),
            None => Ok(false),
        }
    }

    async fn get(&self, generation: &str, key: &RequestKey) -> StoreResult<Option<StoredResponse>> {
        match self.generation(generation) {
            Some(cache) => Ok(cache.get(key).await),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> StoreResult<()> {
        let size = response.body_len();

        // A single entry larger than the whole generation can never be
        // admitted; reject the write so callers can tell the entry was not
        // stored (install must fail, intercept logs and moves on)
        if size > self.max_bytes {
            warn!(
                url = %key.url,
                size,
                max_bytes = self.max_bytes,
                "Entry too large for memory store"
            );
            return Err(std::io::Error::new(
                std::io::ErrorKind::QuotaExceeded,
                format!("entry of {size} bytes exceeds store capacity of {} bytes", self.max_bytes),
            ));
        }

        let cache = self.generation_or_create(generation);
        cache.insert(key, response).await;

        Ok(())
    }
}
