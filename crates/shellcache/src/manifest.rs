//! # Manifest
//!
//! The fixed list of resource identifiers ("app shell") populated into the
//! current cache generation at install time. Entries may be absolute URLs or
//! paths relative to the configured base origin.

use url::Url;

use crate::error::ShellCacheError;

/// The app shell manifest: resource identifiers known at build/deploy time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    /// Create a manifest from a list of resource identifiers
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of entries in the manifest
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the raw entries
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Append an entry
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Resolve every entry to an absolute URL.
    ///
    /// Absolute entries are used as-is; relative entries are joined against
    /// `base`. A relative entry with no base, or an unparseable entry, fails
    /// the whole resolution.
    pub fn resolve(&self, base: Option<&Url>) -> Result<Vec<Url>, ShellCacheError> {
        self.entries
            .iter()
            .map(|entry| resolve_entry(entry, base))
            .collect()
    }
}

fn resolve_entry(entry: &str, base: Option<&Url>) -> Result<Url, ShellCacheError> {
    match Url::parse(entry) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base
                .join(entry)
                .map_err(|e| ShellCacheError::UrlError(format!("{entry}: {e}"))),
            None => Err(ShellCacheError::UrlError(format!(
                "relative manifest entry {entry:?} requires a base origin"
            ))),
        },
        Err(e) => Err(ShellCacheError::UrlError(format!("{entry}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.example.com/").unwrap()
    }

    #[test]
    fn resolves_absolute_and_relative_entries() {
        let manifest = Manifest::new(["/", "index.html", "https://cdn.example.com/lib.js"]);
        let urls = manifest.resolve(Some(&base())).unwrap();

        assert_eq!(urls[0].as_str(), "https://app.example.com/");
        assert_eq!(urls[1].as_str(), "https://app.example.com/index.html");
        assert_eq!(urls[2].as_str(), "https://cdn.example.com/lib.js");
    }

    #[test]
    fn relative_entry_without_base_fails() {
        let manifest = Manifest::new(["/index.html"]);
        let err = manifest.resolve(None).unwrap_err();
        assert!(matches!(err, ShellCacheError::UrlError(_)));
    }

    #[test]
    fn empty_manifest_resolves_to_nothing() {
        let manifest = Manifest::default();
        assert!(manifest.is_empty());
        assert!(manifest.resolve(None).unwrap().is_empty());
    }

    #[test]
    fn push_appends_entries() {
        let mut manifest = Manifest::default();
        manifest.push("/");
        manifest.push("manifest.json");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.iter().collect::<Vec<_>>(), vec!["/", "manifest.json"]);
    }
}
