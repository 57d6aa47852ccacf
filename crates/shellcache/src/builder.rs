//! # Builder for ControllerConfig
//!
//! This module provides a builder pattern implementation for creating and
//! customizing ControllerConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use shellcache::ControllerConfig;
//!
//! let config = ControllerConfig::builder()
//!     .with_generation("pwa-task-tracker-v2")
//!     .with_manifest_entry("/")
//!     .with_manifest_entry("index.html")
//!     .with_base_origin("https://app.example.com/").unwrap()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("MyApp/1.0")
//!     .build();
//!
//! assert_eq!(config.generation, "pwa-task-tracker-v2");
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::ControllerConfig;
use crate::error::ShellCacheError;
use crate::manifest::Manifest;

/// Builder for creating ControllerConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct ControllerConfigBuilder {
    /// Internal config being built
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
        }
    }

    /// Set the current generation tag
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.config.generation = generation.into();
        self
    }

    /// Replace the manifest entirely
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.config.manifest = manifest;
        self
    }

    /// Append a single manifest entry
    pub fn with_manifest_entry(mut self, entry: impl Into<String>) -> Self {
        self.config.manifest.push(entry);
        self
    }

    /// Set the base origin used to resolve relative manifest entries
    pub fn with_base_origin(mut self, origin: &str) -> Result<Self, ShellCacheError> {
        let url = Url::parse(origin).map_err(|e| ShellCacheError::UrlError(format!("{origin}: {e}")))?;
        self.config.base_origin = Some(url);
        Ok(self)
    }

    /// Set the overall request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether redirects are followed
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom header sent with every outbound request
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Replace all custom headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Set the per-generation memory store size cap in bytes
    pub fn with_max_memory_bytes(mut self, max_bytes: u64) -> Self {
        self.config.max_memory_bytes = max_bytes;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ControllerConfig {
        self.config
    }
}

impl Default for ControllerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
