//! Error types for pipeline operations.

use hdrstack_color::ColorError;
use hdrstack_io::IoError;
use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Settings file could not be read or parsed.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// Core data model error.
    #[error(transparent)]
    Core(#[from] hdrstack_core::Error),

    /// Color transform error.
    #[error(transparent)]
    Color(#[from] ColorError),

    /// Asset or output I/O error.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl OpsError {
    /// Returns `true` for errors that abort the asset even when raised by
    /// an optional layer.
    ///
    /// Of the core errors only a channel collision is fatal; resolution,
    /// channel-count and naming problems drop the one layer instead, as
    /// does a buffer the resampler cannot size.
    pub fn is_fatal(&self) -> bool {
        match self {
            OpsError::Core(e) => e.is_fatal(),
            OpsError::InvalidDimensions(_) => false,
            _ => true,
        }
    }

    /// Returns `true` for a channel-name collision.
    pub fn is_collision(&self) -> bool {
        matches!(self, OpsError::Core(hdrstack_core::Error::ChannelCollision { .. }))
    }
}

/// Result type for pipeline operations.
pub type OpsResult<T> = Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hdrstack_core::Error;

    #[test]
    fn test_fatality() {
        assert!(OpsError::from(Error::channel_collision("mattes.alpha.Y")).is_fatal());
        assert!(!OpsError::from(Error::resolution_mismatch((4, 4), (0, 0))).is_fatal());
        assert!(!OpsError::from(Error::invalid_channel_name("urn:x:", "empty")).is_fatal());
        assert!(!OpsError::from(Error::channel_mismatch(1, 3)).is_fatal());
        assert!(!OpsError::InvalidDimensions("empty".into()).is_fatal());
        assert!(OpsError::Settings("bad".into()).is_fatal());
        assert!(OpsError::from(IoError::MissingBase("gone".into())).is_fatal());
        assert!(OpsError::from(IoError::write("out.exr", "disk full")).is_fatal());
    }
}
