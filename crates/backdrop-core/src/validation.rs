//! Upload validation
//!
//! Limits the upload front-end enforces client-side, re-checked where
//! notifications enter the worker so junk objects are dropped early.

use thiserror::Error;

/// Maximum accepted upload size (10 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Content types the product accepts for uploads.
pub const ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/heic"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Upload too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

/// Validate an upload's content type and size against product limits.
pub fn validate_upload(content_type: &str, size: u64) -> Result<(), UploadValidationError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(UploadValidationError::UnsupportedContentType(
            content_type.to_string(),
        ));
    }

    if size > MAX_UPLOAD_SIZE_BYTES {
        return Err(UploadValidationError::TooLarge {
            size,
            limit: MAX_UPLOAD_SIZE_BYTES,
        });
    }

    Ok(())
}
