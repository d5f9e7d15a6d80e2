//! URL to cache path mapping

use std::path::{Path, PathBuf};

use crate::{CacheError, ensure_cache_root};

/// Trailing path segment of a URL, verbatim. Query strings and fragments are
/// kept as part of the name.
pub fn url_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Join the URL's trailing segment onto `cache_root`.
///
/// A URL ending in `/` has no trailing segment and resolves to the root
/// itself; callers must not pass such URLs.
pub fn resolve(cache_root: &Path, url: &str) -> PathBuf {
    match url_file_name(url) {
        "" => cache_root.to_path_buf(),
        name => cache_root.join(name),
    }
}

/// A cache root that is known to exist
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Create the root directory (idempotently) and wrap it.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        ensure_cache_root(&root)?;
        tracing::debug!("cache root ready at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        resolve(&self.root, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple() {
        assert_eq!(
            resolve(Path::new("/cache"), "https://x.test/img.png"),
            Path::new("/cache").join("img.png")
        );
    }

    #[test]
    fn test_resolve_keeps_query() {
        assert_eq!(
            resolve(Path::new("/cache"), "https://x.test/a/b/img.png?v=2"),
            Path::new("/cache").join("img.png?v=2")
        );
    }

    #[test]
    fn test_resolve_trailing_slash_is_root() {
        assert_eq!(resolve(Path::new("/cache"), "https://x.test/dir/"), PathBuf::from("/cache"));
    }

    #[test]
    fn test_resolve_without_slash() {
        assert_eq!(resolve(Path::new("/cache"), "img.png"), Path::new("/cache").join("img.png"));
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(url_file_name("https://example.com/files/document.ktx2"), "document.ktx2");
        assert_eq!(url_file_name("https://example.com/"), "");
    }
}
