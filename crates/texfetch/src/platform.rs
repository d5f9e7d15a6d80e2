//! Platform and capability descriptor
//!
//! Selects per-target behavior at runtime instead of through scattered
//! conditional compilation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use texfetch_image::{TextureFormat, Transcoder};
use url::Url;

/// Deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Desktop and editor hosts
    Desktop,
    /// Android and iOS
    Mobile,
    /// Browser-hosted builds
    Web,
}

impl Platform {
    /// Platform of the running build
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Platform::Web
        } else if cfg!(any(target_os = "android", target_os = "ios")) {
            Platform::Mobile
        } else {
            Platform::Desktop
        }
    }

    /// Browser builds never cache locally, whatever the request says.
    pub fn allows_local_cache(self) -> bool {
        !matches!(self, Platform::Web)
    }

    /// URI handed to the transport to read a cached file.
    ///
    /// Mobile gets a percent-encoded `file://` URL so that `?`, `#` and `%`
    /// in a cached name stay part of the path. Relative paths cannot be
    /// expressed that way and are passed through bare.
    pub fn local_uri(self, path: &Path) -> String {
        match self {
            Platform::Mobile => match Url::from_file_path(path) {
                Ok(url) => url.into(),
                Err(()) => path.display().to_string(),
            },
            Platform::Desktop | Platform::Web => path.display().to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Desktop => "desktop",
            Platform::Mobile => "mobile",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" | "editor" => Ok(Platform::Desktop),
            "mobile" | "android" | "ios" => Ok(Platform::Mobile),
            "web" | "wasm" => Ok(Platform::Web),
            other => Err(format!("unknown platform `{}`", other)),
        }
    }
}

/// What this loader instance can do
#[derive(Clone)]
pub struct Capabilities {
    pub platform: Platform,
    /// Compressed-texture transcoder, if one is available
    pub transcoder: Option<Arc<dyn Transcoder>>,
}

impl Capabilities {
    /// Given platform, raster decoding only
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            transcoder: None,
        }
    }

    /// Current platform plus whatever transcoder this build ships
    pub fn detect() -> Self {
        Self {
            platform: Platform::current(),
            transcoder: builtin_transcoder(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn without_transcoder(mut self) -> Self {
        self.transcoder = None;
        self
    }

    pub fn supports(&self, format: TextureFormat) -> bool {
        self.transcoder.as_ref().is_some_and(|t| t.supports(format))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("platform", &self.platform)
            .field("transcoder", &self.transcoder.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

#[cfg(feature = "ktx")]
fn builtin_transcoder() -> Option<Arc<dyn Transcoder>> {
    Some(Arc::new(texfetch_image::KtxTranscoder::new()))
}

#[cfg(not(feature = "ktx"))]
fn builtin_transcoder() -> Option<Arc<dyn Transcoder>> {
    None
}
