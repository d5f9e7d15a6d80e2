//! Cache Persister
//!
//! Writes fetched bytes to their cache path. Failures are logged and
//! absorbed; a failed write never affects the fetch that produced the bytes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::CacheError;

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// What to do when the cache path already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Leave the existing file alone
    SkipIfExists,
    /// Replace the existing file
    Overwrite,
}

/// Result of a persist attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    Skipped,
    Failed,
}

/// Writes cache entries
#[derive(Debug, Clone, Copy, Default)]
pub struct CachePersister;

impl CachePersister {
    pub fn new() -> Self {
        Self
    }

    /// Persist `bytes` at `path`, swallowing any error.
    pub async fn persist(&self, path: &Path, bytes: &[u8], policy: OverwritePolicy) -> PersistOutcome {
        match self.try_persist(path, bytes, policy).await {
            Ok(outcome) => {
                tracing::debug!("cache {:?}: {}", outcome, path.display());
                outcome
            }
            Err(e) => {
                tracing::warn!("cache write failed: {}", e);
                PersistOutcome::Failed
            }
        }
    }

    /// Persist `bytes` at `path`, reporting errors.
    ///
    /// Data is written to a sibling temporary file and renamed into place, so
    /// a concurrent reader never sees a partial entry.
    pub async fn try_persist(&self, path: &Path, bytes: &[u8], policy: OverwritePolicy) -> Result<PersistOutcome, CacheError> {
        if policy == OverwritePolicy::SkipIfExists && smol::fs::metadata(path).await.is_ok() {
            return Ok(PersistOutcome::Skipped);
        }

        let temp = temp_path(path);
        let result = async {
            smol::fs::write(&temp, bytes).await?;
            smol::fs::rename(&temp, path).await
        }
        .await;

        if let Err(source) = result {
            let _ = smol::fs::remove_file(&temp).await;
            return Err(CacheError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(PersistOutcome::Written)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(
        ".{}.{}.part",
        std::process::id(),
        NEXT_TEMP.fetch_add(1, Ordering::Relaxed)
    ));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path(Path::new("/cache/Textures/img.png"));
        assert_eq!(temp.parent(), Some(Path::new("/cache/Textures")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("img.png."));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/cache/a.ktx");
        assert_ne!(temp_path(path), temp_path(path));
    }
}
