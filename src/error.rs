//! Error types for the corner-watermark-removal crate.

use std::path::PathBuf;

/// Errors that can occur while loading, processing or saving images.
///
/// Degenerate geometry (zero-area images or regions) is never an error:
/// detection reports nothing and removal is a no-op.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be decoded into pixel-addressable form.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// Path of the file that failed to decode.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The output format would re-introduce compression artifacts.
    #[error("refusing to save cleaned image as lossy {0}; use png, bmp, tiff or webp")]
    LossyFormat(String),

    /// A detection threshold outside `[0, 1]` was supplied.
    #[error("threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),

    /// An error occurred during image encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Region report serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
