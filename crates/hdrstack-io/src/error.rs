//! Error types for I/O operations.
//!
//! Provides unified error handling for asset decoding, sidecar files and
//! EXR output.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mandatory base image is missing or undecodable.
    #[error("base image unavailable: {0}")]
    MissingBase(String),

    /// An auxiliary item or file referenced by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Raw pixel data is inconsistent with its declared layout.
    #[error("invalid raw image: {0}")]
    InvalidRaw(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    Decode(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    Encode(String),

    /// Output could not be written; no file was left behind.
    #[error("failed to write {}: {reason}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Unsupported format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Feature requires an optional dependency that was not compiled in.
    #[error("feature unavailable: {0}")]
    UnsupportedFeature(String),

    /// Metadata snapshot could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core data model error.
    #[error(transparent)]
    Core(#[from] hdrstack_core::Error),
}

impl IoError {
    /// Creates an [`IoError::Write`] error.
    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
