//! HTTP Transport
//!
//! GET over `reqwest`'s blocking client, run on smol's blocking pool so the
//! cooperative task stays free. `file://` URIs and bare paths are read from
//! disk instead.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use smol::future::Boxed;
use url::Url;

use crate::{CancelToken, NetError, ProgressSink, Response, Transport};

/// Read size between progress reports and cancellation checks
const CHUNK_SIZE: usize = 16 * 1024;

/// Upper bound on up-front body allocation from an advertised length
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

/// Where a URI points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Remote(Url),
    Local(PathBuf),
}

impl Target {
    /// Classify a URI. Strings without a scheme are treated as local paths.
    pub fn parse(uri: &str) -> Result<Self, NetError> {
        match Url::parse(uri) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Target::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Target::Local)
                    .map_err(|_| NetError::InvalidUrl(uri.to_string())),
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Ok(Target::Local(PathBuf::from(uri))),
                scheme => Err(NetError::InvalidUrl(format!("unsupported scheme `{}`: {}", scheme, uri))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Target::Local(PathBuf::from(uri))),
            Err(e) => Err(NetError::InvalidUrl(format!("{}: {}", uri, e))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Target::Remote(_))
    }
}

/// HTTP transport builder
pub struct HttpTransportBuilder {
    user_agent: String,
    connect_timeout: Option<Duration>,
    no_proxy: bool,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self {
            user_agent: format!("texfetch/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: None,
            no_proxy: false,
        }
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    /// Bound only the connection phase. The transfer itself never times out.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Connect directly, ignoring `HTTP_PROXY` and friends.
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    pub fn build(self) -> Result<HttpTransport, NetError> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent)
            .timeout(None::<Duration>);
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if self.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| NetError::Network(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Default transport: network GET plus local file reads
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, uri: &str, progress: ProgressSink, cancel: CancelToken) -> Boxed<Result<Response, NetError>> {
        let target = Target::parse(uri);
        let client = self.client.clone();

        Box::pin(async move {
            match target? {
                Target::Remote(url) => {
                    tracing::info!("HTTP GET {}", url);
                    smol::unblock(move || download(&client, url, &progress, &cancel)).await
                }
                Target::Local(path) => read_local(path, &progress, &cancel).await,
            }
        })
    }
}

fn download(client: &Client, url: Url, progress: &ProgressSink, cancel: &CancelToken) -> Result<Response, NetError> {
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| NetError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetError::HttpError { status: status.as_u16() });
    }

    let total = response.content_length();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();

    let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            // Dropping the response closes the connection
            tracing::debug!("transfer cancelled after {} bytes", body.len());
            return Err(NetError::Cancelled);
        }
        let n = response
            .read(&mut chunk)
            .map_err(|e| NetError::Network(e.to_string()))?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
        progress.report(body.len() as u64, total);
    }

    Ok(Response {
        status: status.as_u16(),
        headers,
        body,
    })
}

async fn read_local(path: PathBuf, progress: &ProgressSink, cancel: &CancelToken) -> Result<Response, NetError> {
    if cancel.is_cancelled() {
        return Err(NetError::Cancelled);
    }
    let body = smol::fs::read(&path).await?;
    let len = body.len() as u64;
    progress.report(len, Some(len));
    Ok(Response::local(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_remote() {
        let target = Target::parse("https://example.com/textures/brick.png").unwrap();
        assert!(target.is_remote());
    }

    #[test]
    fn test_target_bare_path() {
        let target = Target::parse("/var/cache/Textures/brick.png").unwrap();
        assert_eq!(target, Target::Local(PathBuf::from("/var/cache/Textures/brick.png")));
    }

    #[cfg(unix)]
    #[test]
    fn test_target_file_scheme() {
        let target = Target::parse("file:///var/cache/Textures/brick.png").unwrap();
        assert_eq!(target, Target::Local(PathBuf::from("/var/cache/Textures/brick.png")));
    }

    #[test]
    fn test_target_rejects_other_schemes() {
        assert!(matches!(Target::parse("ftp://example.com/a.png"), Err(NetError::InvalidUrl(_))));
    }
}
