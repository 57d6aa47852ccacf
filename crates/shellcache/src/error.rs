use reqwest::StatusCode;

// Custom error type for cache controller operations
#[derive(Debug, thiserror::Error)]
pub enum ShellCacheError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Install failed while precaching {url}: {source}")]
    InstallFailed {
        url: String,
        #[source]
        source: Box<ShellCacheError>,
    },
}

impl ShellCacheError {
    /// Wrap an error that aborted install while fetching a manifest entry.
    pub(crate) fn install_failed(url: impl Into<String>, source: ShellCacheError) -> Self {
        ShellCacheError::InstallFailed {
            url: url.into(),
            source: Box::new(source),
        }
    }
}
