//! # Network Boundary
//!
//! The [`Fetch`] trait is the controller's only window onto the network. The
//! reqwest-backed [`HttpFetcher`] buffers every response to completion before
//! returning it, so callers always receive an immutable snapshot that can be
//! cloned for both the caller and the store.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::ShellCacheError;
use crate::store::{Request, StoredResponse};

/// Abstraction over a single network fetch.
///
/// A fetch makes exactly one attempt; retry policy belongs to the caller.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Issue the request over the network and buffer the full response.
    ///
    /// A non-success status is not an error here; it is returned as a
    /// response for the caller to inspect. Errors are transport failures
    /// (no connectivity, DNS failure, timeouts).
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, ShellCacheError>;
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &ControllerConfig) -> Result<Client, ShellCacheError> {
    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(ShellCacheError::from)
}

/// Network fetcher backed by a reqwest [`Client`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher from the controller configuration
    pub fn new(config: &ControllerConfig) -> Result<Self, ShellCacheError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Create a fetcher around an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, ShellCacheError> {
        debug!(method = %request.method, url = %request.url, "Fetching from network");

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        // Buffer the whole body; the snapshot is what gets cloned for the
        // caller and for the cache write
        let body = response.bytes().await?;

        Ok(StoredResponse::new(status, headers, body))
    }
}
