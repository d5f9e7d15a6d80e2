//! Fetch Orchestrator
//!
//! Runs one fetch end to end: validate, optional cache probe, network
//! transfer with progress, decode, and write-back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smol::future;
use texfetch_cache::{CacheLayout, CachePersister, OverwritePolicy};
use texfetch_image::{AssetKind, DecodeDispatcher, DecodedImage, declared_type};
use texfetch_net::{
    CancelToken, HttpTransport, NetError, ProgressSink, ProgressTracker, Response, Target, TransferProgress, Transport,
};

use crate::{Capabilities, FetchError, FetchRequest, LoaderConfig, Platform};

/// Asset loader
///
/// Cheap to clone; clones share the transport, decoder and cache layout.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    layout: CacheLayout,
    platform: Platform,
    transport: Arc<dyn Transport>,
    dispatcher: DecodeDispatcher,
    persister: CachePersister,
}

enum Step {
    Progress(TransferProgress),
    Done(Result<Response, NetError>),
}

impl Loader {
    /// Loader over an [`HttpTransport`] built from `config`.
    ///
    /// Creates the cache root if it does not exist.
    pub fn new(config: LoaderConfig, capabilities: Capabilities) -> Result<Self, FetchError> {
        let mut builder = HttpTransport::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let transport = builder.build()?;
        Self::with_transport(config, capabilities, Arc::new(transport))
    }

    /// Loader over a caller-supplied transport.
    pub fn with_transport(
        config: LoaderConfig,
        capabilities: Capabilities,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, FetchError> {
        let layout = CacheLayout::create(config.cache_root)?;
        let dispatcher = match capabilities.transcoder {
            Some(transcoder) => DecodeDispatcher::with_transcoder(transcoder),
            None => DecodeDispatcher::new(),
        };
        tracing::debug!(
            "loader ready: platform={} cache={}",
            capabilities.platform,
            layout.root().display()
        );

        Ok(Self {
            inner: Arc::new(LoaderInner {
                layout,
                platform: capabilities.platform,
                transport,
                dispatcher,
                persister: CachePersister::new(),
            }),
        })
    }

    pub fn platform(&self) -> Platform {
        self.inner.platform
    }

    pub fn cache_root(&self) -> &Path {
        self.inner.layout.root()
    }

    /// Where `url` would be cached.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.inner.layout.resolve(url)
    }

    pub fn dispatcher(&self) -> &DecodeDispatcher {
        &self.inner.dispatcher
    }

    /// Fetch without progress reporting or cancellation.
    pub async fn load(&self, request: &FetchRequest) -> Result<DecodedImage, FetchError> {
        self.fetch(request, &mut |_| {}, &CancelToken::new()).await
    }

    /// Fetch one asset.
    ///
    /// `on_progress` sees a non-decreasing sequence in `[0, 1]` ending in a
    /// single `1.0` once the bytes are in hand; it is silent after `cancel`
    /// fires. A failed cache probe falls through to the network without
    /// surfacing an error. URLs other than `http(s)://` are rejected before
    /// any I/O.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: &mut dyn FnMut(f32),
        cancel: &CancelToken,
    ) -> Result<DecodedImage, FetchError> {
        let url = request.url();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        if !Target::parse(url)?.is_remote() {
            return Err(NetError::InvalidUrl(format!("not an http(s) URL: {}", url)).into());
        }

        let declared = declared_type(url);
        let kind = AssetKind::classify(&declared);
        if let AssetKind::Compressed(format) = kind {
            if !self.inner.dispatcher.supports(format) {
                tracing::warn!("{}: no transcoder for .{}", url, format);
                return Err(FetchError::CapabilityMissing { format });
            }
        }

        let cache_path = if request.use_cache() && self.inner.platform.allows_local_cache() {
            Some(self.inner.layout.resolve(url))
        } else {
            None
        };

        let mut tracker = ProgressTracker::new();

        if let Some(path) = &cache_path {
            match self.read_cached(path, &declared, cancel).await {
                Ok(image) => {
                    ensure_live(cancel)?;
                    tracing::debug!("cache hit: {}", path.display());
                    emit(tracker.finish(), on_progress, cancel);
                    return Ok(image);
                }
                Err(e) => {
                    ensure_live(cancel)?;
                    tracing::trace!("cache miss for {}: {}", url, e);
                }
            }
        }

        let response = self.download(url, &mut tracker, on_progress, cancel).await?;
        ensure_live(cancel)?;

        let image = self.inner.dispatcher.decode(&response.body, &declared, url).await?;
        ensure_live(cancel)?;

        if let Some(path) = &cache_path {
            let policy = if kind.is_compressed() {
                OverwritePolicy::Overwrite
            } else {
                OverwritePolicy::SkipIfExists
            };
            self.inner.persister.persist(path, &response.body, policy).await;
        }

        ensure_live(cancel)?;
        tracing::info!("loaded {} ({}x{})", url, image.width, image.height);
        Ok(image)
    }

    async fn read_cached(&self, path: &Path, declared: &str, cancel: &CancelToken) -> Result<DecodedImage, FetchError> {
        let uri = self.inner.platform.local_uri(path);
        let (sink, _events) = ProgressSink::channel();
        let response = self.inner.transport.get(&uri, sink, cancel.clone()).await?;
        let source = path.display().to_string();
        Ok(self.inner.dispatcher.decode(&response.body, declared, &source).await?)
    }

    /// GET `url`, forwarding transport progress as it arrives.
    async fn download(
        &self,
        url: &str,
        tracker: &mut ProgressTracker,
        on_progress: &mut dyn FnMut(f32),
        cancel: &CancelToken,
    ) -> Result<Response, FetchError> {
        let (sink, events) = ProgressSink::channel();
        let mut transfer = self.inner.transport.get(url, sink, cancel.clone());

        let result = loop {
            let step = future::or(async { Step::Done((&mut transfer).await) }, async {
                match events.recv().await {
                    Ok(progress) => Step::Progress(progress),
                    Err(_) => future::pending().await,
                }
            })
            .await;

            match step {
                Step::Progress(progress) => emit(tracker.advance(progress), on_progress, cancel),
                Step::Done(result) => break result,
            }
        };

        while let Ok(progress) = events.try_recv() {
            emit(tracker.advance(progress), on_progress, cancel);
        }

        let response = result?;
        emit(tracker.finish(), on_progress, cancel);
        Ok(response)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("platform", &self.inner.platform)
            .field("cache_root", &self.inner.layout.root())
            .finish()
    }
}

fn emit(value: Option<f32>, on_progress: &mut dyn FnMut(f32), cancel: &CancelToken) {
    if let Some(value) = value {
        if !cancel.is_cancelled() {
            on_progress(value);
        }
    }
}

fn ensure_live(cancel: &CancelToken) -> Result<(), FetchError> {
    if cancel.is_cancelled() {
        Err(FetchError::Cancelled)
    } else {
        Ok(())
    }
}
