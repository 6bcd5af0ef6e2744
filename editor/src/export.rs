//! Encoding composited images for download and the clipboard.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

/// MIME type of clipboard payloads.
pub const CLIPBOARD_MIME: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("jpeg quality {0} outside 1..=100")]
    InvalidQuality(u8),
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    /// Lossy; alpha is flattened onto white.
    Jpeg { quality: u8 },
}

impl ExportFormat {
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Bytes ready to hand to the host clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode `img` in `format`.
///
/// # Errors
///
/// [`ExportError::InvalidQuality`] for a JPEG quality of 0 or above 100,
/// [`ExportError::Encode`] if the codec fails.
pub fn encode(img: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut out).write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)?;
        }
        ExportFormat::Jpeg { quality } => {
            if !(1..=100).contains(&quality) {
                return Err(ExportError::InvalidQuality(quality));
            }
            let rgb = flatten_on_white(img);
            JpegEncoder::new_with_quality(&mut out, quality).write_image(&rgb, img.width(), img.height(), ExtendedColorType::Rgb8)?;
        }
    }
    Ok(out)
}

/// PNG bytes wrapped for the clipboard.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if PNG encoding fails.
pub fn clipboard_payload(img: &RgbaImage) -> Result<ClipboardPayload, ExportError> {
    Ok(ClipboardPayload { mime: CLIPBOARD_MIME, bytes: encode(img, ExportFormat::Png)? })
}

/// Composite over opaque white and drop alpha.
fn flatten_on_white(img: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(img.as_raw().len() / 4 * 3);
    for p in img.pixels() {
        let a = u32::from(p[3]);
        for c in &p.0[..3] {
            let v = (u32::from(*c) * a + 255 * (255 - a) + 127) / 255;
            rgb.push(u8::try_from(v).unwrap_or(u8::MAX));
        }
    }
    rgb
}
