//! Error types for hdrstack-core operations.
//!
//! The [`Error`] enum covers the failure modes of the in-memory data model:
//! - Buffer construction (dimension and sample-count checks)
//! - Channel layout (channel counts, name validation, name collisions)
//! - Resolution agreement between auxiliary layers and the base image
//! - Headroom validation
//!
//! # Usage
//!
//! ```rust
//! use hdrstack_core::{Error, Result};
//!
//! fn check(w: u32, h: u32) -> Result<()> {
//!     if w == 0 || h == 0 {
//!         return Err(Error::invalid_dimensions(w, h, "zero-sized buffer"));
//!     }
//!     Ok(())
//! }
//! assert!(check(0, 4).is_err());
//! ```
//!
//! # Used By
//!
//! - [`crate::buffer::PixelBuffer`] - construction and channel access
//! - [`crate::composite::CompositeBuilder`] - collision and size checks
//! - `hdrstack-ops` - resampling and reconstruction

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the core data model.
///
/// # Categories
///
/// - **Shape errors**: [`InvalidDimensions`](Error::InvalidDimensions),
///   [`ChannelMismatch`](Error::ChannelMismatch)
/// - **Layer errors**: [`ResolutionMismatch`](Error::ResolutionMismatch)
/// - **Naming errors**: [`InvalidChannelName`](Error::InvalidChannelName),
///   [`ChannelCollision`](Error::ChannelCollision)
/// - **Value errors**: [`InvalidHeadroom`](Error::InvalidHeadroom)
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid buffer dimensions.
    ///
    /// Returned when width or height is zero, or when the sample vector
    /// does not hold exactly `width * height * channels` values.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Channel count differs from what the operation requires.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch {
        /// Expected channel count
        expected: usize,
        /// Actual channel count
        got: usize,
    },

    /// An auxiliary buffer does not match the base resolution.
    ///
    /// Raised by the reconstructor when the gain map was not resampled
    /// first, and by resampling when the target size is not positive.
    #[error("resolution mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ResolutionMismatch {
        /// Base width
        expected_width: u32,
        /// Base height
        expected_height: u32,
        /// Offending buffer width
        width: u32,
        /// Offending buffer height
        height: u32,
    },

    /// Two layers would write the same output channel.
    #[error("channel collision: '{name}' is produced by more than one layer")]
    ChannelCollision {
        /// The duplicated channel name
        name: String,
    },

    /// A tag could not be turned into a usable channel-name fragment.
    #[error("invalid channel name from '{source_tag}': {reason}")]
    InvalidChannelName {
        /// The raw tag that was sanitized
        source_tag: String,
        /// Why the result was rejected
        reason: String,
    },

    /// Headroom below 1.0 or not finite.
    #[error("invalid headroom {0}: must be a finite value >= 1.0")]
    InvalidHeadroom(f32),
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::ChannelMismatch`] error.
    #[inline]
    pub fn channel_mismatch(expected: usize, got: usize) -> Self {
        Self::ChannelMismatch { expected, got }
    }

    /// Creates an [`Error::ResolutionMismatch`] error.
    #[inline]
    pub fn resolution_mismatch(expected: (u32, u32), got: (u32, u32)) -> Self {
        Self::ResolutionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: got.0,
            height: got.1,
        }
    }

    /// Creates an [`Error::ChannelCollision`] error.
    #[inline]
    pub fn channel_collision(name: impl Into<String>) -> Self {
        Self::ChannelCollision { name: name.into() }
    }

    /// Creates an [`Error::InvalidChannelName`] error.
    #[inline]
    pub fn invalid_channel_name(source_tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannelName {
            source_tag: source_tag.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that abort the whole asset.
    ///
    /// Resolution and naming problems on a single auxiliary layer are
    /// recoverable by dropping that layer; collisions are not.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChannelCollision { .. })
    }

    /// Returns `true` if this is a resolution error.
    #[inline]
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::ResolutionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_mismatch() {
        let err = Error::resolution_mismatch((4, 4), (2, 3));
        let msg = err.to_string();
        assert!(msg.contains("4x4"));
        assert!(msg.contains("2x3"));
        assert!(err.is_resolution_error());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_collision_is_fatal() {
        let err = Error::channel_collision("mattes.alpha.Y");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("mattes.alpha.Y"));
    }

    #[test]
    fn test_invalid_headroom_message() {
        let err = Error::InvalidHeadroom(0.5);
        assert!(err.to_string().contains("0.5"));
    }
}
