//! Callback-style fetch API
//!
//! Runs a fetch as a task on a caller-owned [`LocalExecutor`] and reports
//! through boxed callbacks. Exactly one of `on_success` and `on_error` fires
//! per fetch unless the fetch is cancelled first, in which case neither
//! does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use smol::LocalExecutor;
use texfetch_image::DecodedImage;
use texfetch_net::CancelToken;

use crate::{FetchError, FetchRequest, Loader};

/// Progress, success and error callbacks for one fetch
pub struct FetchCallbacks {
    on_progress: Box<dyn FnMut(f32)>,
    on_success: Box<dyn FnOnce(DecodedImage)>,
    on_error: Box<dyn FnOnce(FetchError)>,
}

impl FetchCallbacks {
    pub fn new(
        on_success: impl FnOnce(DecodedImage) + 'static,
        on_error: impl FnOnce(FetchError) + 'static,
    ) -> Self {
        Self {
            on_progress: Box::new(|_| {}),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn on_progress(mut self, on_progress: impl FnMut(f32) + 'static) -> Self {
        self.on_progress = Box::new(on_progress);
        self
    }
}

/// Handle to an in-flight fetch
#[derive(Debug, Clone)]
pub struct FetchHandle {
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
}

impl FetchHandle {
    fn new() -> Self {
        Self {
            cancel: CancelToken::new(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop the fetch and suppress its callbacks.
    ///
    /// Idempotent. After the outcome has been delivered this has no
    /// observable effect.
    pub fn cancel(&self) {
        if !self.is_finished() && !self.cancel.is_cancelled() {
            tracing::debug!("fetch cancelled by caller");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `true` once the success or error callback has run.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

impl Loader {
    /// Start a fetch on `executor` and return immediately.
    ///
    /// An empty URL is reported through `on_error` before this returns.
    pub fn spawn(&self, executor: &LocalExecutor<'_>, request: FetchRequest, callbacks: FetchCallbacks) -> FetchHandle {
        let handle = FetchHandle::new();
        let FetchCallbacks {
            mut on_progress,
            on_success,
            on_error,
        } = callbacks;

        if request.url().is_empty() {
            handle.mark_finished();
            on_error(FetchError::EmptyUrl);
            return handle;
        }

        let loader = self.clone();
        let task = handle.clone();
        executor
            .spawn(async move {
                let result = loader.fetch(&request, &mut *on_progress, &task.cancel).await;
                if task.is_cancelled() {
                    tracing::trace!("dropping outcome of cancelled fetch {}", request.url());
                    return;
                }
                task.mark_finished();
                match result {
                    Ok(image) => on_success(image),
                    Err(e) => on_error(e),
                }
            })
            .detach();

        handle
    }
}
