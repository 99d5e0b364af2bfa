//! Picture decoding: base64 text → validated PNG bytes.
//!
//! Pictures arrive inline as base64, often mangled on the way: data-URI
//! prefixes left in, `=` padding stripped by a URL-safe transport, line
//! breaks inserted every 76 characters. [`repair_base64`] undoes those, then
//! the bytes are decoded with the `image` crate so a corrupt payload is
//! caught here rather than inside the DOCX writer.
//!
//! Everything is re-encoded as PNG: lossless, universally supported by Word,
//! and the only format the chart renderer produces, so the document writer
//! deals with a single picture type.

use crate::error::VisualError;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Standard alphabet, padding required (we add it), lenient about the unused
/// low bits of the last symbol, which some encoders leave dirty.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A PNG ready to embed, with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl PngImage {
    /// Height in EMU for the given display width, preserving aspect ratio.
    pub fn height_for_width(&self, width_emu: u32) -> u32 {
        if self.width_px == 0 {
            return width_emu;
        }
        let ratio = self.height_px as f64 / self.width_px as f64;
        (width_emu as f64 * ratio).round() as u32
    }
}

/// Normalise a base64 payload so a standard decoder accepts it.
///
/// 1. trim surrounding whitespace
/// 2. drop a data-URI prefix (everything up to and including the first comma)
/// 3. drop interior ASCII whitespace (wrapped lines)
/// 4. pad with `=` to a multiple of four
pub fn repair_base64(raw: &str) -> String {
    let trimmed = raw.trim();
    let payload = match trimmed.find(',') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };

    let mut cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let missing = cleaned.len() % 4;
    if missing != 0 {
        cleaned.extend(std::iter::repeat('=').take(4 - missing));
    }
    cleaned
}

/// Repair and decode a base64 payload to raw bytes.
pub fn decode_base64(raw: &str) -> Result<Vec<u8>, VisualError> {
    let repaired = repair_base64(raw);
    if repaired.is_empty() {
        return Err(VisualError::Base64("payload is empty".into()));
    }
    LENIENT_STANDARD
        .decode(repaired.as_bytes())
        .map_err(|e| VisualError::Base64(e.to_string()))
}

/// Decode a base64 picture and normalise it to PNG.
pub fn decode_picture(raw: &str) -> Result<PngImage, VisualError> {
    let bytes = decode_base64(raw)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| VisualError::UnreadableImage(e.to_string()))?;

    // Already PNG: keep the caller's bytes untouched.
    if image::guess_format(&bytes).ok() == Some(ImageFormat::Png) {
        debug!(
            "Decoded PNG picture {}x{} ({} bytes)",
            img.width(),
            img.height(),
            bytes.len()
        );
        return Ok(PngImage {
            width_px: img.width(),
            height_px: img.height(),
            bytes,
        });
    }

    encode_png(&img)
}

/// Encode an in-memory image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<PngImage, VisualError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| VisualError::UnreadableImage(e.to_string()))?;

    debug!(
        "Encoded picture {}x{} → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );

    Ok(PngImage {
        bytes: buf,
        width_px: img.width(),
        height_px: img.height(),
    })
}
