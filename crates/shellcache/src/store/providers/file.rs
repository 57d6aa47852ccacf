//! # File Store
//!
//! This module implements a durable, file-backed generation store. Each
//! generation is a subdirectory; each entry is a content file named by the
//! SHA-256 of its request identity plus a `.meta` JSON sidecar.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::store::types::{RequestKey, StoreResult, StoredResponse};

use super::GenerationStore;

/// Sidecar metadata persisted next to each entry's body
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    size: u64,
    cached_at: u64,
}

impl EntryMeta {
    fn from_entry(key: &RequestKey, response: &StoredResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                // Non-UTF-8 header values are rare and not worth persisting
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            method: key.method.as_str().to_string(),
            url: key.url.clone(),
            status: response.status.as_u16(),
            headers,
            size: response.body_len(),
            cached_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                map.insert(name, value);
            }
        }
        map
    }
}

// Root directory initialization states
const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    init_state: std::sync::Arc<std::sync::atomic::AtomicU8>,
}

impl FileStore {
    /// Create a new file store rooted at the specified directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            init_state: std::sync::Arc::new(std::sync::atomic::AtomicU8::new(UNINITIALIZED)),
        }
    }

    /// Initialize the store root directory.
    ///
    /// The ready state is published only after the directory exists; a
    /// failed creation resets to uninitialized so a later call can retry.
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        loop {
            // Fast path - already initialized
            if self.init_state.load(Ordering::Acquire) == READY {
                return Ok(());
            }

            // Use compare_exchange to ensure only one task initializes
            match self.init_state.compare_exchange(
                UNINITIALIZED,
                INITIALIZING,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // We won the race, do initialization
                    return match fs::create_dir_all(&self.root).await {
                        Ok(()) => {
                            self.init_state.store(READY, Ordering::Release);
                            Ok(())
                        }
                        Err(e) => {
                            self.init_state.store(UNINITIALIZED, Ordering::Release);
                            Err(e)
                        }
                    };
                }
                // Another task is initializing, wait for it to settle
                Err(_) => tokio::task::yield_now().await,
            }
        }
    }

    /// Generation tags become directory names, so they must be plain names
    fn generation_dir(&self, generation: &str) -> io::Result<PathBuf> {
        if generation.is_empty()
            || generation.contains(['/', '\\'])
            || generation == "."
            || generation == ".."
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid generation tag: {generation:?}"),
            ));
        }
        Ok(self.root.join(generation))
    }

    fn entry_path(&self, generation: &str, key: &RequestKey) -> io::Result<PathBuf> {
        Ok(self.generation_dir(generation)?.join(key.to_filename()))
    }

    fn meta_path(&self, generation: &str, key: &RequestKey) -> io::Result<PathBuf> {
        let mut path = self.entry_path(generation, key)?;
        path.set_extension("meta");
        Ok(path)
    }
}

#[async_trait::async_trait]
impl GenerationStore for FileStore {
    async fn open(&self, generation: &str) -> StoreResult<()> {
        self.ensure_initialized().await?;
        fs::create_dir_all(self.generation_dir(generation)?).await?;
        debug!(generation, "Opened file generation");
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        self.ensure_initialized().await?;

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        self.ensure_initialized().await?;

        let dir = self.generation_dir(generation)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(generation, "Deleted file generation");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn contains(&self, generation: &str, key: &RequestKey) -> StoreResult<bool> {
        self.ensure_initialized().await?;

        let data_exists = fs::try_exists(self.entry_path(generation, key)?).await?;
        let meta_exists = fs::try_exists(self.meta_path(generation, key)?).await?;

        Ok(data_exists && meta_exists)
    }

    async fn get(&self, generation: &str, key: &RequestKey) -> StoreResult<Option<StoredResponse>> {
        self.ensure_initialized().await?;

        let data_path = self.entry_path(generation, key)?;
        let meta_path = self.meta_path(generation, key)?;

        if !fs::try_exists(&data_path).await? || !fs::try_exists(&meta_path).await? {
            return Ok(None);
        }

        let meta_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to read entry metadata file");
                return Ok(None);
            }
        };

        let meta: EntryMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to parse entry metadata, treating as miss");
                return Ok(None);
            }
        };

        let Some(status) = meta.status_code() else {
            warn!(path = ?meta_path, status = meta.status, "Invalid status code in entry metadata");
            return Ok(None);
        };

        let body = fs::read(&data_path).await?;

        Ok(Some(StoredResponse::new(
            status,
            meta.header_map(),
            Bytes::from(body),
        )))
    }

    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> StoreResult<()> {
        self.ensure_initialized().await?;

        fs::create_dir_all(self.generation_dir(generation)?).await?;

        let meta = EntryMeta::from_entry(&key, &response);
        let meta_bytes = serde_json::to_vec(&meta).map_err(io::Error::other)?;

        fs::write(self.entry_path(generation, &key)?, &response.body).await?;
        fs::write(self.meta_path(generation, &key)?, meta_bytes).await?;

        Ok(())
    }
}
