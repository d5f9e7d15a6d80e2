//! Fetch requests

/// One asset to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: String,
    use_cache: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, use_cache: bool) -> Self {
        Self {
            url: url.into(),
            use_cache,
        }
    }

    /// Read from and write to the local cache.
    pub fn cached(url: impl Into<String>) -> Self {
        Self::new(url, true)
    }

    /// Always go to the network and leave the cache untouched.
    pub fn uncached(url: impl Into<String>) -> Self {
        Self::new(url, false)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }
}
