//! texfetch Image Decoding
//!
//! Two decode paths: standard raster images through the `image` crate, and
//! compressed textures through an optional [`Transcoder`].

mod decoder;
mod dispatch;
mod format;
#[cfg(feature = "ktx")]
mod ktx;
mod pool;
mod transcoder;

pub use decoder::{DecodedImage, Orientation, RasterDecoder};
pub use dispatch::DecodeDispatcher;
pub use format::{AssetKind, ImageFormat, TextureFormat, declared_type, url_extension};
#[cfg(feature = "ktx")]
pub use ktx::KtxTranscoder;
pub use pool::{PoolStats, StagingBuffer, StagingPool};
pub use transcoder::{TranscodeCompletion, TranscodeJob, TranscodeOutput, TranscodedPixels, Transcoder};

/// Image decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode {file}: {message}")]
    Raster { file: String, message: String },

    #[error("no transcoder for .{format} textures is available in this build")]
    CapabilityMissing { format: TextureFormat },

    #[error("failed to transcode {file} ({len} bytes): {message}")]
    Transcode { len: usize, file: String, message: String },
}
