//! Decoded images and the raster decode path
//!
//! Supports PNG, JPEG, GIF, WebP and BMP via the image crate.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView};

use crate::{DecodeError, ImageFormat};

/// Flip flags relative to a top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    pub flipped_horizontally: bool,
    pub flipped_vertically: bool,
}

impl Orientation {
    pub const UPRIGHT: Self = Self {
        flipped_horizontally: false,
        flipped_vertically: false,
    };

    pub fn new(flipped_horizontally: bool, flipped_vertically: bool) -> Self {
        Self {
            flipped_horizontally,
            flipped_vertically,
        }
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped_horizontally || self.flipped_vertically
    }
}

/// A decoded image owned by whoever received it
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// RGBA pixel data
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Cache path or URL the bytes came from
    pub source_path: String,
    pub orientation: Orientation,
}

impl DecodedImage {
    /// Create from raw RGBA data
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32, source_path: impl Into<String>) -> Self {
        Self {
            pixels,
            width,
            height,
            source_path: source_path.into(),
            orientation: Orientation::UPRIGHT,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Memory size in bytes
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }

    /// Get pixel at (x, y) in stored row order
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        self.pixels
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Standard raster decoder
pub struct RasterDecoder;

impl RasterDecoder {
    /// Decode with a known format, sniffing the bytes when the format is unknown.
    pub fn decode(data: &[u8], format: ImageFormat, source: &str) -> Result<DecodedImage, DecodeError> {
        let format = match format {
            ImageFormat::Unknown => ImageFormat::from_bytes(data),
            known => known,
        };
        let img_format = format
            .to_image_format()
            .ok_or_else(|| DecodeError::UnsupportedFormat(source.to_string()))?;

        let img = image::load(Cursor::new(data), img_format).map_err(|e| DecodeError::Raster {
            file: source.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::image_to_decoded(img, source))
    }

    fn image_to_decoded(img: DynamicImage, source: &str) -> DecodedImage {
        let (width, height) = img.dimensions();
        let rgba = img.into_rgba8();
        DecodedImage::from_rgba(rgba.into_raw(), width, height, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let data = encode_png(3, 2);
        let decoded = RasterDecoder::decode(&data, ImageFormat::Png, "tile.png").unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1), Some([2, 1, 0, 255]));
        assert_eq!(decoded.orientation, Orientation::UPRIGHT);
        assert_eq!(decoded.source_path, "tile.png");
    }

    #[test]
    fn test_decode_sniffs_unknown() {
        let data = encode_png(1, 1);
        let decoded = RasterDecoder::decode(&data, ImageFormat::Unknown, "blob").unwrap();
        assert_eq!(decoded.memory_size(), 4);
    }

    #[test]
    fn test_decode_garbage() {
        let result = RasterDecoder::decode(b"definitely not a png", ImageFormat::Png, "bad.png");
        assert!(matches!(result, Err(DecodeError::Raster { .. })));

        let result = RasterDecoder::decode(b"??", ImageFormat::Unknown, "bad.xyz");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_get_pixel_out_of_bounds() {
        let img = DecodedImage::from_rgba(vec![0; 4], 1, 1, "x");
        assert_eq!(img.get_pixel(1, 0), None);
    }
}
