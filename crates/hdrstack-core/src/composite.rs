//! Multi-layer composite image.
//!
//! A [`CompositeImage`] is an ordered list of named planar channels sharing
//! one resolution. It is the last in-memory form before an EXR is written.
//! Channel order is insertion order; the writer may reorder on disk, but the
//! logical order is what callers and reports see.
//!
//! Construction goes through [`CompositeBuilder`], which enforces the two
//! invariants every writer relies on:
//! - every channel has exactly `width * height` samples
//! - no channel name appears twice

use crate::buffer::PixelBuffer;
use crate::channel::ChannelSpec;
use crate::{Error, Result};
use std::collections::HashSet;

/// One planar channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Full dotted name (`R`, `sdr.G`, `mattes.skin.Y`).
    pub name: String,
    /// Row-major samples, `width * height` long.
    pub samples: Vec<f32>,
}

/// A resolution plus ordered, uniquely named channels.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeImage {
    width: u32,
    height: u32,
    channels: Vec<Channel>,
}

impl CompositeImage {
    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` pair.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// All channels in logical order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Consumes the image, returning its channels.
    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }

    /// Channel names in logical order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Looks up a channel by full name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Returns `true` if a channel with this name exists.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }

    /// Sample of a named channel at `(x, y)`.
    pub fn sample(&self, name: &str, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.channel(name).map(|c| c.samples[idx])
    }

    /// Distinct layer prefixes in first-seen order (`""` for bare channels).
    pub fn layer_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in &self.channels {
            let layer = match c.name.rfind('.') {
                Some(pos) => &c.name[..pos],
                None => "",
            };
            if !out.contains(&layer) {
                out.push(layer);
            }
        }
        out
    }
}

/// Accumulates channels for a [`CompositeImage`].
///
/// # Example
///
/// ```rust
/// use hdrstack_core::{ChannelSpec, CompositeBuilder, PixelBuffer};
///
/// let rgb = PixelBuffer::filled(2, 2, &[0.5, 0.5, 0.5]);
/// let mut builder = CompositeBuilder::new(2, 2);
/// builder.push_buffer(&ChannelSpec::rgb(None), &rgb).unwrap();
/// let image = builder.build();
/// assert_eq!(image.channel_names(), vec!["R", "G", "B"]);
/// ```
#[derive(Debug)]
pub struct CompositeBuilder {
    width: u32,
    height: u32,
    channels: Vec<Channel>,
    names: HashSet<String>,
}

impl CompositeBuilder {
    /// Starts an empty composite at the given resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Target resolution.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns `true` if `name` was already pushed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Appends one planar channel.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelCollision`] if the name is taken
    /// - [`Error::InvalidDimensions`] if the sample count is wrong
    pub fn push_channel(&mut self, name: impl Into<String>, samples: Vec<f32>) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::channel_collision(name));
        }
        let expected = self.width as usize * self.height as usize;
        if samples.len() != expected {
            return Err(Error::invalid_dimensions(
                self.width,
                self.height,
                format!("channel '{}' has {} samples, expected {}", name, samples.len(), expected),
            ));
        }
        self.names.insert(name.clone());
        self.channels.push(Channel { name, samples });
        Ok(())
    }

    /// Appends every channel of `buffer` under the given names, in order.
    ///
    /// Names are checked before any channel is added, so a failed push
    /// leaves the builder unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelMismatch`] if `specs.len()` differs from the buffer's channel count
    /// - [`Error::ResolutionMismatch`] if the buffer is not at the target size
    /// - [`Error::ChannelCollision`] if any name is taken
    pub fn push_buffer(&mut self, specs: &[ChannelSpec], buffer: &PixelBuffer) -> Result<()> {
        if specs.len() != buffer.channels() {
            return Err(Error::channel_mismatch(specs.len(), buffer.channels()));
        }
        if buffer.dimensions() != (self.width, self.height) {
            return Err(Error::resolution_mismatch((self.width, self.height), buffer.dimensions()));
        }
        let names: Vec<String> = specs.iter().map(ChannelSpec::name).collect();
        let mut seen = HashSet::new();
        for name in &names {
            if self.names.contains(name) || !seen.insert(name.as_str()) {
                return Err(Error::channel_collision(name.clone()));
            }
        }
        for (idx, name) in names.into_iter().enumerate() {
            let samples = buffer.channel(idx)?;
            self.names.insert(name.clone());
            self.channels.push(Channel { name, samples });
        }
        Ok(())
    }

    /// Finishes the composite.
    pub fn build(self) -> CompositeImage {
        CompositeImage {
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelSpec, DEPTH_LAYER, SDR_LAYER};

    #[test]
    fn test_push_and_lookup() {
        let rgb = PixelBuffer::filled(2, 2, &[0.2, 0.4, 0.6]);
        let depth = PixelBuffer::filled(2, 2, &[3.0]);

        let mut b = CompositeBuilder::new(2, 2);
        b.push_buffer(&ChannelSpec::rgb(None), &rgb).unwrap();
        b.push_buffer(&ChannelSpec::rgb(Some(SDR_LAYER)), &rgb).unwrap();
        b.push_buffer(&[ChannelSpec::luma(DEPTH_LAYER)], &depth).unwrap();
        let img = b.build();

        assert_eq!(
            img.channel_names(),
            vec!["R", "G", "B", "sdr.R", "sdr.G", "sdr.B", "depth.Y"]
        );
        assert_eq!(img.sample("G", 1, 1), Some(0.4));
        assert_eq!(img.sample("depth.Y", 0, 1), Some(3.0));
        assert_eq!(img.sample("depth.Y", 2, 0), None);
        assert_eq!(img.layer_names(), vec!["", "sdr", "depth"]);
    }

    #[test]
    fn test_collision_leaves_builder_unchanged() {
        let matte = PixelBuffer::filled(2, 2, &[1.0]);
        let mut b = CompositeBuilder::new(2, 2);
        b.push_buffer(&[ChannelSpec::matte("alpha")], &matte).unwrap();
        let err = b
            .push_buffer(&[ChannelSpec::matte("alpha")], &matte)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(b.build().channels().len(), 1);
    }

    #[test]
    fn test_duplicate_within_one_push() {
        let buf = PixelBuffer::filled(1, 1, &[0.0, 0.0]);
        let mut b = CompositeBuilder::new(1, 1);
        let specs = [ChannelSpec::bare("R"), ChannelSpec::bare("R")];
        assert!(matches!(
            b.push_buffer(&specs, &buf),
            Err(Error::ChannelCollision { .. })
        ));
        assert!(b.build().channels().is_empty());
    }

    #[test]
    fn test_size_checked() {
        let buf = PixelBuffer::filled(3, 2, &[0.0]);
        let mut b = CompositeBuilder::new(2, 2);
        let err = b.push_buffer(&[ChannelSpec::luma("depth")], &buf).unwrap_err();
        assert!(err.is_resolution_error());
        assert!(b.push_channel("x.Y", vec![0.0; 3]).is_err());
    }
}
