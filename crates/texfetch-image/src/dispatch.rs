//! Decode Dispatcher
//!
//! Picks the raster or transcoder path for a declared type and runs it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::{
    AssetKind, DecodeError, DecodedImage, Orientation, RasterDecoder, StagingPool, TextureFormat,
    TranscodeCompletion, TranscodeJob, Transcoder,
};

/// Routes bytes to the right decoder
#[derive(Clone, Default)]
pub struct DecodeDispatcher {
    transcoder: Option<Arc<dyn Transcoder>>,
    pool: StagingPool,
}

impl DecodeDispatcher {
    /// Dispatcher with only the raster path
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcoder(transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            transcoder: Some(transcoder),
            pool: StagingPool::default(),
        }
    }

    pub fn with_pool(mut self, pool: StagingPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn pool(&self) -> &StagingPool {
        &self.pool
    }

    /// Whether a compressed format can be decoded by this build
    pub fn supports(&self, format: TextureFormat) -> bool {
        self.transcoder.as_ref().is_some_and(|t| t.supports(format))
    }

    /// Decode `data` according to its declared type.
    ///
    /// `source` names the file in the result and in error messages.
    pub async fn decode(&self, data: &[u8], declared_type: &str, source: &str) -> Result<DecodedImage, DecodeError> {
        match AssetKind::classify(declared_type) {
            AssetKind::Raster(format) => RasterDecoder::decode(data, format, source),
            AssetKind::Unrecognized => {
                tracing::debug!("unrecognized type {} for {}, sniffing content", declared_type, source);
                RasterDecoder::decode(data, crate::ImageFormat::Unknown, source)
            }
            AssetKind::Compressed(format) => self.transcode(format, data, source).await,
        }
    }

    async fn transcode(&self, format: TextureFormat, data: &[u8], source: &str) -> Result<DecodedImage, DecodeError> {
        let transcoder = match &self.transcoder {
            Some(t) if t.supports(format) => t,
            _ => return Err(DecodeError::CapabilityMissing { format }),
        };

        let len = data.len();
        let file_name = file_name(source).to_string();
        let failure = |message: String| DecodeError::Transcode {
            len,
            file: file_name.clone(),
            message,
        };

        let job = TranscodeJob {
            format,
            file_name: file_name.clone(),
            data: self.pool.stage(data),
        };
        let (done, rx) = TranscodeCompletion::channel();

        // The staging buffer travels with the job; whichever way the
        // transcoder exits, dropping it returns it to the pool.
        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| transcoder.transcode(job, done)));
        if let Err(payload) = dispatched {
            let message = panic_message(payload.as_ref());
            tracing::warn!("transcoder {} panicked on {}: {}", transcoder.name(), file_name, message);
            return Err(failure(format!("transcoder panicked: {}", message)));
        }

        let output = rx
            .recv()
            .await
            .map_err(|_| failure("transcoder dropped the request without a result".into()))?;

        match output.image {
            Some(pixels) => Ok(DecodedImage::from_rgba(pixels.rgba, pixels.width, pixels.height, source)
                .with_orientation(Orientation::new(output.flipped_horizontally, output.flipped_vertically))),
            None => Err(failure(output.reason.unwrap_or_else(|| "no image produced".into()))),
        }
    }
}

fn file_name(source: &str) -> &str {
    source.rsplit(['/', '\\']).next().unwrap_or(source)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("https://x.test/tex/a.ktx"), "a.ktx");
        assert_eq!(file_name("C:\\cache\\Textures\\a.ktx"), "a.ktx");
        assert_eq!(file_name("a.ktx"), "a.ktx");
    }

    #[test]
    fn test_capability_missing_without_transcoder() {
        let dispatcher = DecodeDispatcher::new();
        assert!(!dispatcher.supports(TextureFormat::Ktx2));

        let result = smol::block_on(dispatcher.decode(b"whatever", "image/ktx2", "a.ktx2"));
        assert!(matches!(
            result,
            Err(DecodeError::CapabilityMissing { format: TextureFormat::Ktx2 })
        ));
    }
}
