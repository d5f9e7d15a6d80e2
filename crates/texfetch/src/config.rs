//! Loader configuration

use std::path::PathBuf;
use std::time::Duration;

use texfetch_cache::{CacheError, default_cache_root};

/// Application directory name under the platform data dir
pub const APP_NAME: &str = "texfetch";

/// Loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory holding cached downloads
    pub cache_root: PathBuf,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Connection timeout; transfers themselves are never timed out
    pub connect_timeout: Option<Duration>,
}

impl LoaderConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            user_agent: format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")),
            connect_timeout: None,
        }
    }

    /// Cache under `<data dir>/texfetch/Textures`.
    pub fn from_default_root() -> Result<Self, CacheError> {
        Ok(Self::new(default_cache_root(APP_NAME)?))
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
