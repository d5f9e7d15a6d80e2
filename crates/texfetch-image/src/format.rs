//! Declared types and decode-path classification

use std::fmt;

use image::ImageFormat as ImgFormat;

/// Standard raster formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.len() < 8 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        if data.starts_with(b"BM") {
            return Self::Bmp;
        }

        Self::Unknown
    }

    /// Get format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "webp" => Self::WebP,
            "bmp" => Self::Bmp,
            _ => Self::Unknown,
        }
    }

    pub(crate) fn to_image_format(self) -> Option<ImgFormat> {
        match self {
            Self::Png => Some(ImgFormat::Png),
            Self::Jpeg => Some(ImgFormat::Jpeg),
            Self::Gif => Some(ImgFormat::Gif),
            Self::WebP => Some(ImgFormat::WebP),
            Self::Bmp => Some(ImgFormat::Bmp),
            Self::Unknown => None,
        }
    }
}

/// Compressed texture containers that need a transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Ktx,
    Ktx2,
    Basis,
}

impl TextureFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ktx" => Some(Self::Ktx),
            "ktx2" => Some(Self::Ktx2),
            "basis" => Some(Self::Basis),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Ktx => "ktx",
            Self::Ktx2 => "ktx2",
            Self::Basis => "basis",
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which decode path a declared type selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Raster(ImageFormat),
    Compressed(TextureFormat),
    Unrecognized,
}

impl AssetKind {
    /// Classify an `image/<ext>` declared type. The subtype is matched
    /// case-insensitively.
    pub fn classify(declared_type: &str) -> Self {
        let subtype = declared_type.strip_prefix("image/").unwrap_or(declared_type);
        if let Some(format) = TextureFormat::from_extension(subtype) {
            return Self::Compressed(format);
        }
        match ImageFormat::from_extension(subtype) {
            ImageFormat::Unknown => Self::Unrecognized,
            format => Self::Raster(format),
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }
}

/// Extension of the URL's trailing segment, verbatim. Empty if there is none.
pub fn url_extension(url: &str) -> &str {
    let name = url.rsplit('/').next().unwrap_or(url);
    match name.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => "",
    }
}

/// `"image/" + extension`, used only to pick a decode path.
pub fn declared_type(url: &str) -> String {
    format!("image/{}", url_extension(url))
}
