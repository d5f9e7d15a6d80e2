//! Transcoder collaborator
//!
//! A transcoder turns a compressed-texture container into RGBA pixels. It is
//! event driven: [`Transcoder::transcode`] returns immediately and the result
//! arrives later through a [`TranscodeCompletion`], possibly from a worker
//! thread.

use smol::channel::{self, Receiver, Sender};

use crate::{StagingBuffer, TextureFormat};

/// Optional compressed-texture capability
pub trait Transcoder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn supports(&self, format: TextureFormat) -> bool;

    /// Start transcoding. Must eventually call `done.complete` or drop `done`.
    fn transcode(&self, job: TranscodeJob, done: TranscodeCompletion);
}

/// Input handed to a transcoder
#[derive(Debug)]
pub struct TranscodeJob {
    pub format: TextureFormat,
    /// File name of the source, for diagnostics
    pub file_name: String,
    pub data: StagingBuffer,
}

/// RGBA pixels produced by a transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodedPixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// The "loaded" event: a populated image, or `None` on failure
#[derive(Debug, Clone, Default)]
pub struct TranscodeOutput {
    pub image: Option<TranscodedPixels>,
    pub flipped_horizontally: bool,
    pub flipped_vertically: bool,
    /// Why `image` is empty, when the transcoder knows
    pub reason: Option<String>,
}

impl TranscodeOutput {
    pub fn loaded(image: TranscodedPixels, flipped_horizontally: bool, flipped_vertically: bool) -> Self {
        Self {
            image: Some(image),
            flipped_horizontally,
            flipped_vertically,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// One-shot completion callback
#[derive(Debug)]
pub struct TranscodeCompletion {
    tx: Sender<TranscodeOutput>,
}

impl TranscodeCompletion {
    pub fn channel() -> (Self, Receiver<TranscodeOutput>) {
        let (tx, rx) = channel::bounded(1);
        (Self { tx }, rx)
    }

    /// Report the result. Consumes the completion so it fires at most once.
    pub fn complete(self, output: TranscodeOutput) {
        if self.tx.try_send(output).is_err() {
            tracing::debug!("transcode result discarded, receiver gone");
        }
    }
}
