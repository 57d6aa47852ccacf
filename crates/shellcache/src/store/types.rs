//! # Store Types
//!
//! This module defines common types used across the generation store system.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

/// An outbound request as seen by the interception policy
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method of the request
    pub method: Method,
    /// Absolute URL of the resource
    pub url: Url,
    /// Request headers forwarded to the network on a miss
    pub headers: HeaderMap,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request for the given URL
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// The cache identity of this request
    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method.clone(),
            url: self.url.to_string(),
        }
    }
}

/// Cache key identifying a stored response by request identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// HTTP method (effectively always GET for stored entries)
    pub method: Method,
    /// Absolute URL of the resource
    pub url: String,
}

impl RequestKey {
    /// Create a new request key
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Key for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Convert to a filename-safe string
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str());
        hasher.update(":");
        hasher.update(&self.url);

        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// A fully buffered response snapshot.
///
/// The body is held as [`Bytes`], so cloning yields an independent handle to
/// the same immutable buffer. This is what lets the interception policy hand
/// one copy to the caller and write another into the store without consuming
/// a stream twice.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    /// HTTP status of the response
    pub status: StatusCode,
    /// Response headers as received
    pub headers: HeaderMap,
    /// Complete response body
    pub body: Bytes,
}

impl StoredResponse {
    /// Create a stored response
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Whether this response signals success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Size of the body in bytes
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Where an intercepted response was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    /// Response found in a cache generation, no network access occurred
    Cache,
    /// Response fetched over the network
    Network,
}

/// Result of an interception: the response plus its provenance
#[derive(Debug, Clone)]
pub struct Served {
    /// The response handed back to the caller
    pub response: StoredResponse,
    /// Whether it came from the cache or the network
    pub from: ServedFrom,
}

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, std::io::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_identity_includes_method() {
        let get = RequestKey::get("https://example.com/app.js");
        let head = RequestKey::new(Method::HEAD, "https://example.com/app.js");
        assert_ne!(get, head);
        assert_ne!(get.to_filename(), head.to_filename());
    }

    #[test]
    fn to_filename_is_stable_and_hex() {
        let key = RequestKey::get("https://example.com/");
        let name = key.to_filename();
        assert_eq!(name, key.to_filename());
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stored_response_clone_shares_body() {
        let body = Bytes::from_static(b"app shell");
        let response = StoredResponse::new(StatusCode::OK, HeaderMap::new(), body.clone());
        let copy = response.clone();
        assert_eq!(copy.body, response.body);
        assert!(copy.is_success());
        assert_eq!(copy.body_len(), 9);
    }
}
