use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::manifest::Manifest;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Default generation tag used when none is configured.
///
/// Changing the configured tag is the sole versioning signal: a new tag
/// triggers a fresh install/activate cycle and purges superseded generations.
pub const DEFAULT_GENERATION: &str = "app-shell-v1";

/// Configurable options for the cache controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Tag of the current cache generation
    pub generation: String,

    /// App shell manifest populated at install time
    pub manifest: Manifest,

    /// Base origin for resolving relative manifest entries
    pub base_origin: Option<Url>,

    /// Overall timeout for the entire HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Per-generation size cap for the in-memory store, in bytes
    pub max_memory_bytes: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.to_owned(),
            manifest: Manifest::default(),
            base_origin: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ControllerConfig::get_default_headers(),
            max_memory_bytes: 30 * 1024 * 1024, // 30MB
        }
    }
}

impl ControllerConfig {
    pub fn builder() -> crate::builder::ControllerConfigBuilder {
        crate::builder::ControllerConfigBuilder::new()
    }

    /// Default headers sent with every outbound request
    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("*/*"),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = ControllerConfig::default();
        assert_eq!(config.generation, DEFAULT_GENERATION);
        assert!(config.manifest.is_empty());
        assert!(config.follow_redirects);
        assert!(config.headers.contains_key(reqwest::header::ACCEPT));
    }
}
