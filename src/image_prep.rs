// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image preparation for vision requests

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::resolver::Extension;
use crate::{Result, SnapKeeperError};

/// An image ready to be sent to a provider
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Base64 payload (standard alphabet, padded)
    pub base64: String,
    pub mime_type: &'static str,
    /// True if the image was shrunk before encoding
    pub downscaled: bool,
}

impl PreparedImage {
    pub fn from_bytes(data: &[u8], mime_type: &'static str, downscaled: bool) -> Self {
        Self {
            base64: general_purpose::STANDARD.encode(data),
            mime_type,
            downscaled,
        }
    }

    /// `data:` URI for OpenAI-style `image_url` parts
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Read, size-check and (if needed) downscale an image
pub fn prepare_image(path: &Path, max_bytes: u64, max_dimension: u32) -> Result<PreparedImage> {
    let ext = Extension::from_path(path)
        .ok_or_else(|| SnapKeeperError::UnsupportedFileType(path.display().to_string()))?;

    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(SnapKeeperError::ImageTooLarge { size, limit: max_bytes });
    }

    let data = std::fs::read(path)?;

    match downscale(&data, max_dimension) {
        Ok(Some(jpeg)) => {
            debug!("Downscaled {:?} to fit {}px", path, max_dimension);
            Ok(PreparedImage::from_bytes(&jpeg, "image/jpeg", true))
        }
        Ok(None) => Ok(PreparedImage::from_bytes(&data, ext.mime_type(), false)),
        Err(e) => {
            // The provider may still cope with what we can't decode
            debug!("Could not decode {:?} ({}), sending raw bytes", path, e);
            Ok(PreparedImage::from_bytes(&data, ext.mime_type(), false))
        }
    }
}

/// Shrink to `max_dimension` on the longest side, re-encoded as JPEG
fn downscale(data: &[u8], max_dimension: u32) -> Result<Option<Vec<u8>>> {
    let img = image::load_from_memory(data)?;

    if img.width() <= max_dimension && img.height() <= max_dimension {
        return Ok(None);
    }

    let resized = img.resize(max_dimension, max_dimension, image::imageops::FilterType::Triangle);
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;

    Ok(Some(buffer))
}
