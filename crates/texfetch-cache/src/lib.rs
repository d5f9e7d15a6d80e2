//! texfetch Disk Cache
//!
//! A flat directory of downloaded files named after the last segment of
//! their URL. Existence of a same-named file is the whole index: no
//! manifest, no expiry, no eviction.

mod persist;
mod resolver;

pub use persist::{CachePersister, OverwritePolicy, PersistOutcome};
pub use resolver::{CacheLayout, resolve, url_file_name};

use std::path::{Path, PathBuf};

/// Directory under the persistent storage root that holds cached files
pub const TEXTURES_DIR: &str = "Textures";

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cannot create cache root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no persistent storage directory on this platform")]
    NoStorageRoot,
}

/// `<data dir>/<app>/Textures` for the current user.
pub fn default_cache_root(app: &str) -> Result<PathBuf, CacheError> {
    dirs::data_dir()
        .map(|dir| dir.join(app).join(TEXTURES_DIR))
        .ok_or(CacheError::NoStorageRoot)
}

/// Create the cache root if it does not exist yet. Idempotent.
pub fn ensure_cache_root(root: &Path) -> Result<(), CacheError> {
    std::fs::create_dir_all(root).map_err(|source| CacheError::CreateRoot {
        path: root.to_path_buf(),
        source,
    })
}
