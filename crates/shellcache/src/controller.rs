//! # Cache Controller
//!
//! The lifecycle and interception controller: `install` populates the
//! current generation from the app shell manifest, `activate` deletes
//! superseded generations and claims open clients, and `intercept` mediates
//! every outbound request through a cache-first policy.

use std::sync::Arc;

use futures::future;
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::{ClientGateway, NoopGateway};
use crate::config::ControllerConfig;
use crate::error::ShellCacheError;
use crate::fetch::{Fetch, HttpFetcher};
use crate::store::{
    GenerationStore, MemoryStore, Request, RequestKey, Served, ServedFrom, StoredResponse,
};

/// Cache lifecycle and interception controller.
///
/// Generic over the generation store, the network fetcher, and the client
/// gateway so each boundary can be substituted in tests.
pub struct CacheController<S, F, G = NoopGateway> {
    store: Arc<S>,
    fetcher: Arc<F>,
    gateway: Arc<G>,
    config: ControllerConfig,
}

impl CacheController<MemoryStore, HttpFetcher, NoopGateway> {
    /// Create a controller with an in-memory store, a reqwest-backed
    /// fetcher, and no client tracking
    pub fn from_config(config: ControllerConfig) -> Result<Self, ShellCacheError> {
        let store = Arc::new(MemoryStore::new(config.max_memory_bytes));
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::new(config, store, fetcher, Arc::new(NoopGateway)))
    }
}

impl<S, F, G> CacheController<S, F, G>
where
    S: GenerationStore + 'static,
    F: Fetch,
    G: ClientGateway,
{
    /// Create a controller over the given boundaries
    pub fn new(config: ControllerConfig, store: Arc<S>, fetcher: Arc<F>, gateway: Arc<G>) -> Self {
        Self {
            store,
            fetcher,
            gateway,
            config,
        }
    }

    /// The controller's configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The underlying generation store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Populate the current generation from the manifest.
    ///
    /// All manifest entries are fetched concurrently and staged; nothing is
    /// written until every fetch succeeded, so a failed install leaves the
    /// generation without any of this manifest's entries. On success the
    /// gateway is asked to skip waiting.
    pub async fn install(&self) -> Result<(), ShellCacheError> {
        let generation = self.config.generation.as_str();
        info!(generation, entries = self.config.manifest.len(), "Installing cache generation");

        self.store.open(generation).await?;

        let urls = self.config.manifest.resolve(self.config.base_origin.as_ref())?;

        // Fetch every entry concurrently; one failure aborts the install
        let staged = future::try_join_all(urls.into_iter().map(|url| self.precache(url))).await?;

        for (key, response) in staged {
            self.store.put(generation, key, response).await?;
        }

        info!(generation, "Install complete, requesting immediate takeover");
        self.gateway.skip_waiting().await;

        Ok(())
    }

    /// Fetch one manifest entry, failing the install on any transport error
    /// or non-success status
    async fn precache(&self, url: Url) -> Result<(RequestKey, StoredResponse), ShellCacheError> {
        let request = Request::get(url);

        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => return Err(ShellCacheError::install_failed(request.url.to_string(), e)),
        };

        if !response.is_success() {
            return Err(ShellCacheError::install_failed(
                request.url.to_string(),
                ShellCacheError::StatusCode(response.status),
            ));
        }

        Ok((request.key(), response))
    }

    /// Delete every generation whose tag differs from the current one, then
    /// claim open clients.
    ///
    /// Deletions run concurrently and are best-effort: one failure is logged
    /// and never blocks the others or activation itself.
    pub async fn activate(&self) -> Result<(), ShellCacheError> {
        let current = self.config.generation.as_str();
        info!(generation = current, "Activating cache generation");

        let stale: Vec<String> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        let deletions = stale.into_iter().map(|name| {
            let store = Arc::clone(&self.store);
            async move {
                match store.delete(&name).await {
                    Ok(true) => debug!(generation = %name, "Deleted stale cache generation"),
                    Ok(false) => debug!(generation = %name, "Stale generation already gone"),
                    Err(e) => {
                        warn!(generation = %name, error = %e, "Failed to delete stale cache generation")
                    }
                }
            }
        });
        future::join_all(deletions).await;

        self.gateway.claim().await;
        info!(generation = current, "Activation complete, clients claimed");

        Ok(())
    }

    /// Mediate one outbound request through the cache-first policy.
    ///
    /// Non-GET requests bypass the cache entirely. For GET requests, a hit
    /// in any generation is served without touching the network; on a miss
    /// a single fetch is made, and a successful response is copied into the
    /// current generation before being handed back.
    pub async fn intercept(&self, request: Request) -> Result<Served, ShellCacheError> {
        if request.method != reqwest::Method::GET {
            debug!(method = %request.method, url = %request.url, "Passing through non-GET request");
            let response = self.fetcher.fetch(&request).await?;
            return Ok(Served {
                response,
                from: ServedFrom::Network,
            });
        }

        let key = request.key();

        // Lookup spans every generation still present, not just the current one
        match self.store.match_any(&key).await {
            Ok(Some(response)) => {
                debug!(url = %request.url, "Serving from cache");
                return Ok(Served {
                    response,
                    from: ServedFrom::Cache,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache lookup failed, falling back to network")
            }
        }

        debug!(url = %request.url, "Cache miss, fetching from network");
        let response = self.fetcher.fetch(&request).await?;

        // Cache only success responses, and never at the caller's expense: a
        // failed write is logged and swallowed. The clone shares the buffered
        // body, so the caller's copy and the stored copy are equivalent.
        if response.is_success() {
            if let Err(e) = self
                .store
                .put(&self.config.generation, key, response.clone())
                .await
            {
                warn!(url = %request.url, error = %e, "Failed to cache network response");
            }
        }

        Ok(Served {
            response,
            from: ServedFrom::Network,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use reqwest::header::HeaderMap;
    use reqwest::{Method, StatusCode};

    /// Scripted network: responses keyed by URL, a call counter, and an
    /// offline switch
    struct FakeFetcher {
        responses: Mutex<HashMap<String, (StatusCode, Bytes)>>,
        calls: AtomicUsize,
        offline: AtomicBool,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
            }
        }

        fn script(&self, url: &str, status: StatusCode, body: &str) {
            self.responses
                .lock()
                .insert(url.to_string(), (status, Bytes::from(body.to_string())));
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn fetch(&self, request: &Request) -> Result<StoredResponse, ShellCacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.offline.load(Ordering::SeqCst) {
                return Err(ShellCacheError::IoError(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "offline",
                )));
            }

            match self.responses.lock().get(request.url.as_str()) {
                Some((status, body)) => Ok(StoredResponse::new(
                    *status,
                    HeaderMap::new(),
                    body.clone(),
                )),
                None => Err(ShellCacheError::IoError(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "unreachable host",
                ))),
            }
        }
    }

    /// Gateway that records the order of lifecycle signals
    #[derive(Default)]
    struct RecordingGateway {
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingGateway {
        fn events(&self) -> Vec<&'static str> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl ClientGateway for RecordingGateway {
        async fn skip_waiting(&self) {
            self.events.lock().push("skip_waiting");
        }

        async fn claim(&self) {
            self.events.lock().push("claim");
        }
    }

    type TestController = CacheController<MemoryStore, FakeFetcher, RecordingGateway>;

    fn controller(config: ControllerConfig) -> TestController {
        CacheController::new(
            config,
            Arc::new(MemoryStore::new(1024 * 1024)),
            Arc::new(FakeFetcher::new()),
            Arc::new(RecordingGateway::default()),
        )
    }

    fn shell_config(generation: &str) -> ControllerConfig {
        ControllerConfig::builder()
            .with_generation(generation)
            .with_manifest(Manifest::new(["/", "/index.html"]))
            .with_base_origin("https://app.example.com/")
            .unwrap()
            .build()
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn install_populates_current_generation() {
        let ctrl = controller(shell_config("pwa-task-tracker-v2"));
        ctrl.fetcher.script("https://app.example.com/", StatusCode::OK, "<shell>");
        ctrl.fetcher
            .script("https://app.example.com/index.html", StatusCode::OK, "<html>");

        ctrl.install().await.unwrap();

        let store = ctrl.store();
        let root = RequestKey::get("https://app.example.com/");
        let index = RequestKey::get("https://app.example.com/index.html");
        assert!(store.contains("pwa-task-tracker-v2", &root).await.unwrap());
        assert!(store.contains("pwa-task-tracker-v2", &index).await.unwrap());

        // Takeover requested only after the generation is fully populated
        assert_eq!(ctrl.gateway.events(), vec!["skip_waiting"]);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher.script("https://app.example.com/", StatusCode::OK, "<shell>");
        ctrl.fetcher
            .script("https://app.example.com/index.html", StatusCode::NOT_FOUND, "missing");

        let err = ctrl.install().await.unwrap_err();
        assert!(matches!(err, ShellCacheError::InstallFailed { .. }));

        // No manifest entry was promoted, and no takeover was requested
        let root = RequestKey::get("https://app.example.com/");
        assert!(!ctrl.store().contains("v1", &root).await.unwrap());
        assert!(ctrl.gateway.events().is_empty());
    }

    #[tokio::test]
    async fn install_fails_on_transport_error() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher.set_offline(true);

        let err = ctrl.install().await.unwrap_err();
        assert!(matches!(err, ShellCacheError::InstallFailed { .. }));
        assert!(ctrl.gateway.events().is_empty());
    }

    #[tokio::test]
    async fn install_fails_when_manifest_entry_exceeds_store_capacity() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.script(
            "https://app.example.com/big.bin",
            StatusCode::OK,
            "this body is far larger than ten bytes",
        );
        let config = ControllerConfig::builder()
            .with_generation("v1")
            .with_manifest(Manifest::new(["/big.bin"]))
            .with_base_origin("https://app.example.com/")
            .unwrap()
            .with_max_memory_bytes(10)
            .build();
        let ctrl = CacheController::new(
            config,
            Arc::new(MemoryStore::new(10)),
            Arc::clone(&fetcher),
            Arc::new(RecordingGateway::default()),
        );

        // A manifest entry the store cannot hold must fail the install, not
        // quietly leave a hole in the shell
        let err = ctrl.install().await.unwrap_err();
        assert!(matches!(err, ShellCacheError::IoError(_)));
        assert!(ctrl.gateway.events().is_empty());

        let key = RequestKey::get("https://app.example.com/big.bin");
        assert!(!ctrl.store().contains("v1", &key).await.unwrap());
    }

    #[tokio::test]
    async fn activate_deletes_stale_generations() {
        let ctrl = controller(shell_config("v2"));
        let store = ctrl.store();
        let key = RequestKey::get("https://app.example.com/old.js");
        let kept = RequestKey::get("https://app.example.com/new.js");

        store
            .put("v1", key.clone(), ok_response("old"))
            .await
            .unwrap();
        store
            .put("v2", kept.clone(), ok_response("new"))
            .await
            .unwrap();

        ctrl.activate().await.unwrap();

        let mut names = store.list().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["v2".to_string()]);
        assert!(store.contains("v2", &kept).await.unwrap());
        assert_eq!(ctrl.gateway.events(), vec!["claim"]);
    }

    #[tokio::test]
    async fn activate_with_only_current_is_noop() {
        let ctrl = controller(shell_config("v2"));
        ctrl.store().open("v2").await.unwrap();

        ctrl.activate().await.unwrap();

        assert_eq!(ctrl.store().list().await.unwrap(), vec!["v2".to_string()]);
        assert_eq!(ctrl.gateway.events(), vec!["claim"]);
    }

    #[tokio::test]
    async fn cache_hit_makes_no_network_call() {
        let ctrl = controller(shell_config("v1"));
        let key = RequestKey::get("https://app.example.com/app.js");
        ctrl.store()
            .put("v1", key, ok_response("cached"))
            .await
            .unwrap();
        ctrl.store().run_pending_tasks("v1").await;

        let served = ctrl.intercept(get("https://app.example.com/app.js")).await.unwrap();

        assert_eq!(served.from, ServedFrom::Cache);
        assert_eq!(served.response.body, Bytes::from_static(b"cached"));
        assert_eq!(ctrl.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn miss_fetches_and_warms_the_cache() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher
            .script("https://app.example.com/data.json", StatusCode::OK, "{}");

        let first = ctrl.intercept(get("https://app.example.com/data.json")).await.unwrap();
        assert_eq!(first.from, ServedFrom::Network);
        assert_eq!(first.response.body, Bytes::from_static(b"{}"));

        // Idempotent warm-up: the second identical request is a cache hit
        let second = ctrl.intercept(get("https://app.example.com/data.json")).await.unwrap();
        assert_eq!(second.from, ServedFrom::Cache);
        assert_eq!(second.response.body, first.response.body);
        assert_eq!(ctrl.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn non_success_response_is_returned_but_never_cached() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher
            .script("https://app.example.com/gone", StatusCode::NOT_FOUND, "nope");

        let served = ctrl.intercept(get("https://app.example.com/gone")).await.unwrap();
        assert_eq!(served.response.status, StatusCode::NOT_FOUND);
        assert_eq!(served.from, ServedFrom::Network);

        // With the network gone, the same request must fail instead of
        // serving a stale cached error page
        ctrl.fetcher.set_offline(true);
        let err = ctrl.intercept(get("https://app.example.com/gone")).await.unwrap_err();
        assert!(matches!(err, ShellCacheError::IoError(_)));
    }

    #[tokio::test]
    async fn non_get_requests_bypass_the_cache() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher
            .script("https://app.example.com/api", StatusCode::OK, "posted");

        let request = Request::new(Method::POST, Url::parse("https://app.example.com/api").unwrap());
        let served = ctrl.intercept(request.clone()).await.unwrap();
        assert_eq!(served.from, ServedFrom::Network);

        // Nothing was written, and a repeat POST goes to the network again
        assert!(ctrl.store().list().await.unwrap().is_empty());
        ctrl.intercept(request).await.unwrap();
        assert_eq!(ctrl.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn offline_miss_surfaces_the_failure() {
        let ctrl = controller(shell_config("v1"));
        ctrl.fetcher.set_offline(true);

        let err = ctrl.intercept(get("https://app.example.com/new.png")).await.unwrap_err();
        assert!(matches!(err, ShellCacheError::IoError(_)));
        assert_eq!(ctrl.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_affect_the_caller() {
        /// Store whose writes always fail
        struct BrokenPutStore(MemoryStore);

        #[async_trait]
        impl GenerationStore for BrokenPutStore {
            async fn open(&self, generation: &str) -> crate::store::StoreResult<()> {
                self.0.open(generation).await
            }
            async fn list(&self) -> crate::store::StoreResult<Vec<String>> {
                self.0.list().await
            }
            async fn delete(&self, generation: &str) -> crate::store::StoreResult<bool> {
                self.0.delete(generation).await
            }
            async fn contains(
                &self,
                generation: &str,
                key: &RequestKey,
            ) -> crate::store::StoreResult<bool> {
                self.0.contains(generation, key).await
            }
            async fn get(
                &self,
                generation: &str,
                key: &RequestKey,
            ) -> crate::store::StoreResult<Option<StoredResponse>> {
                self.0.get(generation, key).await
            }
            async fn put(
                &self,
                _generation: &str,
                _key: RequestKey,
                _response: StoredResponse,
            ) -> crate::store::StoreResult<()> {
                Err(io::Error::other("disk full"))
            }
        }

        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.script("https://app.example.com/big.bin", StatusCode::OK, "bits");
        let ctrl = CacheController::new(
            shell_config("v1"),
            Arc::new(BrokenPutStore(MemoryStore::new(1024))),
            Arc::clone(&fetcher),
            Arc::new(RecordingGateway::default()),
        );

        let served = ctrl.intercept(get("https://app.example.com/big.bin")).await.unwrap();
        assert_eq!(served.response.body, Bytes::from_static(b"bits"));
        assert_eq!(served.from, ServedFrom::Network);
    }

    #[tokio::test]
    async fn end_to_end_offline_shell() {
        let ctrl = controller(shell_config("pwa-task-tracker-v2"));
        ctrl.fetcher.script("https://app.example.com/", StatusCode::OK, "<shell>");
        ctrl.fetcher
            .script("https://app.example.com/index.html", StatusCode::OK, "<html>");

        ctrl.install().await.unwrap();
        ctrl.activate().await.unwrap();
        ctrl.store().run_pending_tasks("pwa-task-tracker-v2").await;
        ctrl.fetcher.set_offline(true);

        // The app shell stays available offline
        let shell = ctrl.intercept(get("https://app.example.com/")).await.unwrap();
        assert_eq!(shell.from, ServedFrom::Cache);
        assert_eq!(shell.response.body, Bytes::from_static(b"<shell>"));

        // A never-fetched resource is a network failure, not a fallback
        let err = ctrl.intercept(get("https://app.example.com/new.png")).await.unwrap_err();
        assert!(matches!(err, ShellCacheError::IoError(_)));

        assert_eq!(ctrl.gateway.events(), vec!["skip_waiting", "claim"]);
    }

    fn ok_response(body: &str) -> StoredResponse {
        StoredResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from(body.to_string()))
    }
}
