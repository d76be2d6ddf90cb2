//! Raw decoded pixel payloads.
//!
//! Container readers hand out images as a mode, a size, a row stride and a
//! byte vector. [`RawImage::to_buffer`] normalizes those bytes into a float
//! [`PixelBuffer`] by dividing each sample by the mode's maximum value.
//!
//! # Layout
//!
//! ```text
//! row 0: [px0 px1 ... pxW-1 | padding]   <- stride bytes
//! row 1: [px0 px1 ... pxW-1 | padding]
//! ```
//!
//! 16-bit samples are little-endian.

use std::fmt;
use std::str::FromStr;

use hdrstack_core::PixelBuffer;
use serde::{Deserialize, Serialize};

use crate::{IoError, IoResult};

/// Sample layout of a [`RawImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelMode {
    /// 8-bit luminance
    L,
    /// 16-bit luminance
    L16,
    /// 8-bit RGB
    Rgb,
    /// 8-bit RGBA
    Rgba,
    /// 16-bit RGB
    Rgb16,
    /// 16-bit RGBA
    Rgba16,
}

impl PixelMode {
    /// Interleaved channels per pixel.
    pub const fn channels(self) -> usize {
        match self {
            PixelMode::L | PixelMode::L16 => 1,
            PixelMode::Rgb | PixelMode::Rgb16 => 3,
            PixelMode::Rgba | PixelMode::Rgba16 => 4,
        }
    }

    /// Bytes per sample.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            PixelMode::L | PixelMode::Rgb | PixelMode::Rgba => 1,
            PixelMode::L16 | PixelMode::Rgb16 | PixelMode::Rgba16 => 2,
        }
    }

    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        self.channels() * self.bytes_per_sample()
    }

    /// Largest sample value, used for normalization.
    pub const fn max_value(self) -> f32 {
        if self.bytes_per_sample() == 2 { 65535.0 } else { 255.0 }
    }

    /// `true` if the last channel is alpha.
    pub const fn has_alpha(self) -> bool {
        matches!(self, PixelMode::Rgba | PixelMode::Rgba16)
    }

    /// Short name used in snapshots (`L`, `L;16`, `RGB`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            PixelMode::L => "L",
            PixelMode::L16 => "L;16",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
            PixelMode::Rgb16 => "RGB;16",
            PixelMode::Rgba16 => "RGBA;16",
        }
    }

    /// Mode for a channel count and bit depth.
    pub fn from_layout(channels: usize, bits: u8) -> Option<Self> {
        match (channels, bits > 8) {
            (1, false) => Some(PixelMode::L),
            (1, true) => Some(PixelMode::L16),
            (3, false) => Some(PixelMode::Rgb),
            (3, true) => Some(PixelMode::Rgb16),
            (4, false) => Some(PixelMode::Rgba),
            (4, true) => Some(PixelMode::Rgba16),
            _ => None,
        }
    }
}

impl fmt::Display for PixelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelMode {
    type Err = IoError;

    fn from_str(s: &str) -> IoResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Ok(PixelMode::L),
            "L;16" | "I;16" | "L16" => Ok(PixelMode::L16),
            "RGB" => Ok(PixelMode::Rgb),
            "RGBA" => Ok(PixelMode::Rgba),
            "RGB;16" | "RGB16" => Ok(PixelMode::Rgb16),
            "RGBA;16" | "RGBA16" => Ok(PixelMode::Rgba16),
            other => Err(IoError::UnsupportedFormat(format!("pixel mode '{}'", other))),
        }
    }
}

impl TryFrom<String> for PixelMode {
    type Error = IoError;

    fn try_from(s: String) -> IoResult<Self> {
        s.parse()
    }
}

impl From<PixelMode> for String {
    fn from(m: PixelMode) -> Self {
        m.name().to_string()
    }
}

/// A decoded image exactly as a container reader produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    mode: PixelMode,
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl RawImage {
    /// Wraps raw bytes after checking they cover `height` rows of `stride`.
    ///
    /// The last row may omit its padding.
    pub fn new(mode: PixelMode, width: u32, height: u32, stride: usize, data: Vec<u8>) -> IoResult<Self> {
        if width == 0 || height == 0 {
            return Err(IoError::InvalidRaw(format!("zero-sized image {}x{}", width, height)));
        }
        let row_bytes = width as usize * mode.bytes_per_pixel();
        if stride < row_bytes {
            return Err(IoError::InvalidRaw(format!(
                "stride {} shorter than row of {} bytes",
                stride, row_bytes
            )));
        }
        let needed = stride * (height as usize - 1) + row_bytes;
        if data.len() < needed {
            return Err(IoError::InvalidRaw(format!(
                "{} {}x{} needs {} bytes, got {}",
                mode,
                width,
                height,
                needed,
                data.len()
            )));
        }
        Ok(Self {
            mode,
            width,
            height,
            stride,
            data,
        })
    }

    /// Wraps tightly packed rows.
    pub fn packed(mode: PixelMode, width: u32, height: u32, data: Vec<u8>) -> IoResult<Self> {
        let stride = width as usize * mode.bytes_per_pixel();
        Self::new(mode, width, height, stride, data)
    }

    /// Packs 16-bit samples as little-endian bytes.
    pub fn from_u16(mode: PixelMode, width: u32, height: u32, samples: &[u16]) -> IoResult<Self> {
        if mode.bytes_per_sample() != 2 {
            return Err(IoError::InvalidRaw(format!("{} is not a 16-bit mode", mode)));
        }
        let data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::packed(mode, width, height, data)
    }

    /// Pixel mode.
    pub fn mode(&self) -> PixelMode {
        self.mode
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes from one row start to the next.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw bytes, including row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.mode.bytes_per_pixel()]
    }

    /// Rows without padding, concatenated.
    pub fn packed_bytes(&self) -> Vec<u8> {
        (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect()
    }

    /// Samples as `u16`, one per channel, padding removed.
    ///
    /// 8-bit modes are widened without rescaling.
    pub fn samples_u16(&self) -> Vec<u16> {
        let packed = self.packed_bytes();
        if self.mode.bytes_per_sample() == 2 {
            packed
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect()
        } else {
            packed.into_iter().map(u16::from).collect()
        }
    }

    /// Normalizes every channel to `[0, 1]` floats.
    pub fn to_buffer(&self) -> IoResult<PixelBuffer> {
        let max = self.mode.max_value();
        let data: Vec<f32> = self.samples_u16().into_iter().map(|v| v as f32 / max).collect();
        Ok(PixelBuffer::from_data(self.width, self.height, self.mode.channels(), data)?)
    }

    /// Normalizes and keeps the first `channels` channels.
    ///
    /// `3` drops alpha from RGBA; `1` takes the first channel of a
    /// multi-channel auxiliary image.
    pub fn to_buffer_channels(&self, channels: usize) -> IoResult<PixelBuffer> {
        let full = self.to_buffer()?;
        if channels > full.channels() {
            return Err(IoError::InvalidRaw(format!(
                "{} image has {} channels, {} requested",
                self.mode,
                full.channels(),
                channels
            )));
        }
        Ok(full.truncate_channels(channels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("rgba".parse::<PixelMode>().unwrap(), PixelMode::Rgba);
        assert_eq!("I;16".parse::<PixelMode>().unwrap(), PixelMode::L16);
        assert!("CMYK".parse::<PixelMode>().is_err());
        assert_eq!(PixelMode::from_layout(3, 10), Some(PixelMode::Rgb16));
    }

    #[test]
    fn test_stride_honored() {
        // 2x2 L with one padding byte per row.
        let raw = RawImage::new(PixelMode::L, 2, 2, 3, vec![0, 255, 99, 51, 102, 99]).unwrap();
        let buf = raw.to_buffer().unwrap();
        assert_eq!(buf.data(), &[0.0, 1.0, 0.2, 0.4]);
    }

    #[test]
    fn test_last_row_padding_optional() {
        assert!(RawImage::new(PixelMode::L, 2, 2, 4, vec![0; 6]).is_ok());
        assert!(RawImage::new(PixelMode::L, 2, 2, 4, vec![0; 5]).is_err());
        assert!(RawImage::new(PixelMode::L, 2, 2, 1, vec![0; 8]).is_err());
    }

    #[test]
    fn test_16bit_little_endian() {
        let raw = RawImage::from_u16(PixelMode::L16, 2, 1, &[65535, 0x8000]).unwrap();
        assert_eq!(&raw.data()[..2], &[0xff, 0xff]);
        assert_eq!(&raw.data()[2..], &[0x00, 0x80]);
        let buf = raw.to_buffer().unwrap();
        assert_eq!(buf.data()[0], 1.0);
        assert!((buf.data()[1] - 0.500_007_6).abs() < 1e-6);
    }

    #[test]
    fn test_drop_alpha_and_first_channel() {
        let raw = RawImage::packed(PixelMode::Rgba, 1, 1, vec![255, 0, 51, 128]).unwrap();
        let rgb = raw.to_buffer_channels(3).unwrap();
        assert_eq!(rgb.data(), &[1.0, 0.0, 0.2]);
        let y = raw.to_buffer_channels(1).unwrap();
        assert_eq!(y.data(), &[1.0]);

        let l = RawImage::packed(PixelMode::L, 1, 1, vec![1]).unwrap();
        assert!(l.to_buffer_channels(3).is_err());
    }
}
