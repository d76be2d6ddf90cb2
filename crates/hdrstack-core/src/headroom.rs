//! HDR headroom scalar.
//!
//! Headroom is the largest linear multiplier a gain map can apply relative
//! to SDR reference white. A gain value `g` in `[0, 1]` maps to the
//! multiplier `(h - 1) * g + 1`, which spans `[1, h]`.

use crate::{Error, Result};
use std::fmt;

/// A validated headroom value, always finite and `>= 1.0`.
///
/// # Example
///
/// ```rust
/// use hdrstack_core::Headroom;
///
/// let h = Headroom::new(3.0).unwrap();
/// assert_eq!(h.multiplier(0.0), 1.0);
/// assert_eq!(h.multiplier(1.0), 3.0);
/// assert!(Headroom::new(0.9).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Headroom(f32);

impl Headroom {
    /// Headroom of exactly 1.0: the gain map contributes no boost.
    pub const NONE: Headroom = Headroom(1.0);

    /// Validates and wraps a headroom value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeadroom`] for NaN, infinities and values
    /// below 1.0.
    pub fn new(value: f32) -> Result<Self> {
        if value.is_finite() && value >= 1.0 {
            Ok(Self(value))
        } else {
            Err(Error::InvalidHeadroom(value))
        }
    }

    /// Raw value.
    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }

    /// `h - 1`, the slope of the gain remap.
    #[inline]
    pub fn boost(self) -> f32 {
        self.0 - 1.0
    }

    /// `true` when the gain map cannot change any pixel.
    #[inline]
    pub fn is_degenerate(self) -> bool {
        self.0 == 1.0
    }

    /// Per-pixel multiplier for gain value `g`: `(h - 1) * g + 1`.
    #[inline]
    pub fn multiplier(self, g: f32) -> f32 {
        g * self.boost() + 1.0
    }
}

impl Default for Headroom {
    fn default() -> Self {
        Self::NONE
    }
}

impl TryFrom<f32> for Headroom {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Headroom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
