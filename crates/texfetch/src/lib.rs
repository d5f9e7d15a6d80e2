//! texfetch
//!
//! Loads images by URL: from a flat local cache when a copy exists, from the
//! network otherwise. Raster formats are decoded in process; compressed
//! texture containers go through a pluggable transcoder.
//!
//! ```no_run
//! use texfetch::{Capabilities, FetchRequest, Loader, LoaderConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = Loader::new(LoaderConfig::from_default_root()?, Capabilities::detect())?;
//! let image = smol::block_on(loader.load(&FetchRequest::cached("https://example.com/bricks.png")))?;
//! println!("{}x{}", image.width, image.height);
//! # Ok(())
//! # }
//! ```

mod callbacks;
mod config;
mod loader;
mod platform;
mod request;

pub use callbacks::{FetchCallbacks, FetchHandle};
pub use config::{APP_NAME, LoaderConfig};
pub use loader::Loader;
pub use platform::{Capabilities, Platform};
pub use request::FetchRequest;

pub use texfetch_cache::{CacheError, OverwritePolicy};
pub use texfetch_image::{DecodeError, DecodedImage, Orientation, TextureFormat, Transcoder};
pub use texfetch_net::{CancelToken, NetError, Transport};

/// Fetch error
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Rejected before any work started
    #[error("empty URL")]
    EmptyUrl,

    #[error(transparent)]
    Transport(NetError),

    #[error("no transcoder for .{format} textures is available in this build")]
    CapabilityMissing { format: TextureFormat },

    #[error(transparent)]
    Decode(DecodeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Caller mistakes, as opposed to failures of the fetch itself.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, FetchError::EmptyUrl)
    }
}

impl From<NetError> for FetchError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Cancelled => FetchError::Cancelled,
            other => FetchError::Transport(other),
        }
    }
}

impl From<DecodeError> for FetchError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::CapabilityMissing { format } => FetchError::CapabilityMissing { format },
            other => FetchError::Decode(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(FetchError::EmptyUrl.to_string(), "empty URL");
        assert_eq!(
            FetchError::from(NetError::HttpError { status: 404 }).to_string(),
            "HTTP error: 404"
        );
        assert_eq!(
            FetchError::CapabilityMissing {
                format: TextureFormat::Ktx2
            }
            .to_string(),
            "no transcoder for .ktx2 textures is available in this build"
        );
    }

    #[test]
    fn test_conversions() {
        assert!(matches!(FetchError::from(NetError::Cancelled), FetchError::Cancelled));
        assert!(matches!(
            FetchError::from(DecodeError::CapabilityMissing {
                format: TextureFormat::Basis
            }),
            FetchError::CapabilityMissing {
                format: TextureFormat::Basis
            }
        ));
        assert!(FetchError::EmptyUrl.is_usage_error());
        assert!(!FetchError::Cancelled.is_usage_error());
    }
}
