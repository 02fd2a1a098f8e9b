//! Image attachments are stored inline as base64 data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::repository::{RepoResult, RepositoryError};

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 << 20;

/// Detect the MIME type of a supported image from its magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

/// Validate an uploaded image and encode it as a `data:` URL.
pub fn encode_image(bytes: &[u8], max_bytes: usize) -> RepoResult<String> {
    if bytes.len() > max_bytes {
        return Err(RepositoryError::InvalidInput(
            "image file size is too big".to_string(),
        ));
    }

    let mime = sniff_image_type(bytes).ok_or_else(|| {
        RepositoryError::InvalidInput("unsupported image format, use JPEG/PNG/GIF".to_string())
    })?;

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}
