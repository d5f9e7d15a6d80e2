//! texfetch Networking
//!
//! Transport used by the loader: a single GET per asset, with byte-level
//! progress and cooperative cancellation. Local files are read through the
//! same abstraction so cache probes and downloads share one code path.

mod cancel;
mod http;
mod progress;
mod transport;

pub use cancel::CancelToken;
pub use http::{HttpTransport, HttpTransportBuilder, Target};
pub use progress::{ProgressTracker, TransferProgress};
pub use transport::{ProgressSink, Transport};

/// Fetch a URI with a default [`HttpTransport`], ignoring progress.
pub async fn fetch(uri: &str) -> Result<Response, NetError> {
    let transport = HttpTransport::new()?;
    let (sink, _events) = ProgressSink::channel();
    transport.get(uri, sink, CancelToken::new()).await
}

/// Completed transfer
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Response for a local read, which has no headers.
    pub fn local(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
        }
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Network error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("transfer cancelled")]
    Cancelled,
}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e.to_string())
    }
}
