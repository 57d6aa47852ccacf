//! # Shellcache
//!
//! An offline-first cache controller for a fixed set of application assets
//! (the "app shell"). It keeps at most one generation-tagged durable cache
//! active at a time and mediates every GET request through a cache-first
//! policy with network fallback and opportunistic population.
//!
//! ## Features
//!
//! - Install/activate lifecycle with atomic manifest precaching
//! - Generation-tagged stores with best-effort stale-generation cleanup
//! - Cache-first interception: hits never touch the network, successful
//!   misses warm the current generation
//! - Pluggable store, fetcher, and client-gateway boundaries

pub mod builder;
pub mod clients;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod store;

pub use builder::ControllerConfigBuilder;
pub use clients::{ClientGateway, NoopGateway};
pub use config::{ControllerConfig, DEFAULT_GENERATION};
pub use controller::CacheController;
pub use error::ShellCacheError;
pub use fetch::{Fetch, HttpFetcher, create_client};
pub use manifest::Manifest;
pub use store::{
    FileStore, GenerationStore, MemoryStore, Request, RequestKey, Served, ServedFrom, StoreResult,
    StoredResponse,
};
