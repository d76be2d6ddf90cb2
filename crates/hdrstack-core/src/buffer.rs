//! Floating-point pixel buffers.
//!
//! [`PixelBuffer`] is the unit of data that flows between pipeline stages:
//! extraction produces one per layer, the color chain and the reconstructor
//! consume one and return a new one, and the compositor copies channels out
//! of it into the final [`CompositeImage`](crate::CompositeImage).
//!
//! # Memory Layout
//!
//! Samples are stored interleaved, row-major, top-to-bottom:
//!
//! ```text
//! [R G B R G B R G B ...]  <- row 0
//! [R G B R G B R G B ...]  <- row 1
//! ```
//!
//! Single-channel layers (gain map, depth, mattes) store one sample per pixel.

use crate::{Error, Result};

/// An owned, interleaved `f32` image with 1..N channels.
///
/// Buffers are never shared between stages; each stage takes ownership or
/// borrows and returns a fresh buffer.
///
/// # Example
///
/// ```rust
/// use hdrstack_core::PixelBuffer;
///
/// let buf = PixelBuffer::filled(4, 4, &[1.0, 0.5, 0.25]);
/// assert_eq!(buf.channels(), 3);
/// assert_eq!(buf.pixel(2, 3), &[1.0, 0.5, 0.25]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(width: u32, height: u32, channels: usize) -> Self {
        let len = width as usize * height as usize * channels;
        Self {
            width,
            height,
            channels,
            data: vec![0.0; len],
        }
    }

    /// Creates a buffer from interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if either dimension or the
    /// channel count is zero, or if `data.len()` does not match.
    pub fn from_data(width: u32, height: u32, channels: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero-sized buffer"));
        }
        if channels == 0 {
            return Err(Error::invalid_dimensions(width, height, "buffer has no channels"));
        }
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} samples, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Creates a buffer where every pixel equals `pixel`.
    ///
    /// The channel count is `pixel.len()`.
    pub fn filled(width: u32, height: u32, pixel: &[f32]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self {
            width,
            height,
            channels: pixel.len(),
            data,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` pair.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of interleaved channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples of one row, all channels interleaved.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.width as usize * self.channels
    }

    /// All samples.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// All samples, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the buffer, returning its samples.
    #[inline]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Samples of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels;
        &self.data[idx..idx + self.channels]
    }

    /// Mutable samples of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels;
        &mut self.data[idx..idx + self.channels]
    }

    /// Copies one channel out as a planar vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelMismatch`] if `index` is out of range.
    pub fn channel(&self, index: usize) -> Result<Vec<f32>> {
        if index >= self.channels {
            return Err(Error::channel_mismatch(index + 1, self.channels));
        }
        Ok(self
            .data
            .chunks_exact(self.channels)
            .map(|px| px[index])
            .collect())
    }

    /// Keeps only the first `count` channels.
    ///
    /// Used to drop alpha from RGBA sources or to reduce a multi-channel
    /// auxiliary image to its first channel.
    pub fn truncate_channels(&self, count: usize) -> Result<Self> {
        if count == 0 || count > self.channels {
            return Err(Error::channel_mismatch(count, self.channels));
        }
        if count == self.channels {
            return Ok(self.clone());
        }
        let data = self
            .data
            .chunks_exact(self.channels)
            .flat_map(|px| px[..count].iter().copied())
            .collect();
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: count,
            data,
        })
    }

    /// Broadcasts a single-channel buffer to `count` identical channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelMismatch`] unless the buffer has exactly one
    /// channel.
    pub fn replicate(&self, count: usize) -> Result<Self> {
        if self.channels != 1 {
            return Err(Error::channel_mismatch(1, self.channels));
        }
        let data = self
            .data
            .iter()
            .flat_map(|&v| std::iter::repeat_n(v, count))
            .collect();
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: count,
            data,
        })
    }

    /// Returns `true` if `other` has the same width and height.
    #[inline]
    pub fn same_size(&self, other: &PixelBuffer) -> bool {
        self.dimensions() == other.dimensions()
    }
}
