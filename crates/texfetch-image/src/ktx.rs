//! KTX 1.1 Transcoder
//!
//! Handles uncompressed `GL_UNSIGNED_BYTE` textures in `GL_RGBA` or `GL_RGB`
//! layout, first mip level of the first face only. Work runs on smol's
//! blocking pool and the result is marshalled back through the completion.

use crate::{TextureFormat, TranscodeCompletion, TranscodeJob, TranscodeOutput, TranscodedPixels, Transcoder};

const KTX_IDENTIFIER: [u8; 12] = [0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];
const ENDIANNESS_LE: u32 = 0x0403_0201;
const ENDIANNESS_BE: u32 = 0x0102_0304;
const HEADER_LEN: usize = 64;

const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_RGB: u32 = 0x1907;
const GL_RGBA: u32 = 0x1908;

const ORIENTATION_KEY: &[u8] = b"KTXorientation";

/// Built-in transcoder for uncompressed KTX files
#[derive(Debug, Default, Clone, Copy)]
pub struct KtxTranscoder;

impl KtxTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transcoder for KtxTranscoder {
    fn name(&self) -> &str {
        "ktx"
    }

    fn supports(&self, format: TextureFormat) -> bool {
        format == TextureFormat::Ktx
    }

    fn transcode(&self, job: TranscodeJob, done: TranscodeCompletion) {
        smol::spawn(async move {
            let output = smol::unblock(move || match parse(&job.data) {
                Ok(output) => output,
                Err(reason) => TranscodeOutput::failed(reason),
            })
            .await;
            done.complete(output);
        })
        .detach();
    }
}

struct Reader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl Reader<'_> {
    fn u32_at(&self, offset: usize) -> Result<u32, String> {
        let bytes: [u8; 4] = self
            .data
            .get(offset..offset.saturating_add(4))
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| format!("truncated at offset {}", offset))?;
        Ok(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// Decode a KTX 1.1 container into RGBA plus flip flags.
pub(crate) fn parse(data: &[u8]) -> Result<TranscodeOutput, String> {
    if data.len() < HEADER_LEN || data[..12] != KTX_IDENTIFIER {
        return Err("not a KTX 1.1 file".into());
    }

    let mut reader = Reader { data, big_endian: false };
    reader.big_endian = match reader.u32_at(12)? {
        ENDIANNESS_LE => false,
        ENDIANNESS_BE => true,
        other => return Err(format!("bad endianness marker {:#010x}", other)),
    };

    let gl_type = reader.u32_at(16)?;
    let gl_format = reader.u32_at(24)?;
    let width = reader.u32_at(36)?;
    let height = reader.u32_at(40)?.max(1);
    let depth = reader.u32_at(44)?;
    let kv_len = reader.u32_at(60)? as usize;

    if gl_type != GL_UNSIGNED_BYTE {
        return Err(format!("unsupported glType {:#06x} (block-compressed data needs another transcoder)", gl_type));
    }
    let channels = match gl_format {
        GL_RGBA => 4,
        GL_RGB => 3,
        other => return Err(format!("unsupported glFormat {:#06x}", other)),
    };
    if width == 0 || depth > 1 {
        return Err("only 2D textures are supported".into());
    }

    let (flip_h, flip_v) = read_orientation(&reader, HEADER_LEN, kv_len)?;

    let image_offset = HEADER_LEN.checked_add(kv_len).ok_or_else(overflow)?;
    let image_size = reader.u32_at(image_offset)? as usize;
    let row_bytes = (width as usize).checked_mul(channels).ok_or_else(overflow)?;
    let stride = row_bytes.checked_add(3).ok_or_else(overflow)? & !3;
    let needed = stride.checked_mul(height as usize).ok_or_else(overflow)?;
    if image_size < needed {
        return Err(format!("mip 0 holds {} bytes, expected {}", image_size, needed));
    }
    let start = image_offset + 4;
    let end = start.checked_add(needed).ok_or_else(overflow)?;
    let pixels = data.get(start..end).ok_or_else(|| "pixel data truncated".to_string())?;

    // Bounded by the pixel data actually present
    let mut rgba = Vec::with_capacity(pixels.len() / channels * 4);
    for row in pixels.chunks_exact(stride) {
        for px in row[..row_bytes].chunks_exact(channels) {
            rgba.extend_from_slice(&px[..3]);
            rgba.push(if channels == 4 { px[3] } else { 255 });
        }
    }

    Ok(TranscodeOutput::loaded(TranscodedPixels { width, height, rgba }, flip_h, flip_v))
}

fn overflow() -> String {
    "dimensions overflow".to_string()
}

/// Read `KTXorientation` ("S=r,T=d" style). Absent means upright.
fn read_orientation(reader: &Reader<'_>, start: usize, len: usize) -> Result<(bool, bool), String> {
    let end = start.checked_add(len).ok_or_else(overflow)?;
    let mut offset = start;
    while offset + 4 <= end {
        let entry_len = reader.u32_at(offset)? as usize;
        let entry = (offset + 4)
            .checked_add(entry_len)
            .and_then(|entry_end| reader.data.get(offset + 4..entry_end))
            .ok_or_else(|| "key/value data truncated".to_string())?;
        offset += 4 + pad4(entry_len);

        let Some(nul) = entry.iter().position(|&b| b == 0) else {
            continue;
        };
        if &entry[..nul] != ORIENTATION_KEY {
            continue;
        }
        let value = String::from_utf8_lossy(&entry[nul + 1..]);
        let value = value.trim_end_matches('\0');
        let flip_h = value.split(',').any(|part| part.trim() == "S=l");
        let flip_v = value.split(',').any(|part| part.trim() == "T=u");
        return Ok((flip_h, flip_v));
    }
    Ok((false, false))
}
