use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// The two independent namespaces kept inside one cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Raw sitemap or page bodies, as returned by the server.
    Document,
    /// Titles resolved from a page's `<title>` element.
    Title,
}

impl CacheKind {
    fn dir_name(self) -> &'static str {
        match self {
            CacheKind::Document => "documents",
            CacheKind::Title => "titles",
        }
    }
}

/// File-backed memoization of fetched documents and resolved titles.
///
/// Every entry is a single file named after the SHA-256 digest of the URL it
/// belongs to. The existence of that file is the cache-hit signal; there is
/// no index and no expiry, entries go away only when the directory is
/// removed by hand.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `root`. Nothing is created on disk until
    /// the first [`CacheStore::put`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derives the file name used for `url`: the lowercase hex SHA-256
    /// digest of the exact URL string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sitemap_search::cache::CacheStore;
    ///
    /// let key = CacheStore::key("https://example.com/sitemap.xml");
    /// assert_eq!(key.len(), 64);
    /// assert_eq!(key, CacheStore::key("https://example.com/sitemap.xml"));
    /// ```
    pub fn key(url: &str) -> String {
        format!("{:x}", Sha256::digest(url.as_bytes()))
    }

    pub fn path(&self, kind: CacheKind, url: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(Self::key(url))
    }

    /// Returns the cached value for `url`, or `None` when there is no entry
    /// or it cannot be read.
    pub async fn get(&self, kind: CacheKind, url: &str) -> Option<String> {
        match fs::read_to_string(self.path(kind, url)).await {
            Ok(value) => {
                tracing::debug!(url, ?kind, "cache hit");
                Some(value)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(url, ?kind, error = %e, "unreadable cache entry, ignoring it");
                None
            }
        }
    }

    /// Stores `value` for `url`, creating the cache directory if needed.
    /// Writing the same value twice is harmless.
    pub async fn put(&self, kind: CacheKind, url: &str, value: &str) -> io::Result<()> {
        let target_path = self.path(kind, url);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(target_path, value).await
    }
}

