//! Resampling auxiliary layers to the base resolution.
//!
//! # Filters
//!
//! - [`Filter::Nearest`] - picks the source sample under each target pixel center
//! - [`Filter::Bilinear`] - separable triangle filter, widened when downscaling (default)
//!
//! Resampling a buffer to its own size returns an identical copy, so
//! layers already at base resolution pass through bit-exact.
//!
//! # Example
//!
//! ```rust
//! use hdrstack_core::PixelBuffer;
//! use hdrstack_ops::resize::{resample, Filter};
//!
//! let gain = PixelBuffer::filled(2, 2, &[0.5]);
//! let up = resample(&gain, 8, 6, Filter::Bilinear).unwrap();
//! assert_eq!(up.dimensions(), (8, 6));
//! assert!((up.pixel(7, 5)[0] - 0.5).abs() < 1e-6);
//! ```

use std::fmt;
use std::str::FromStr;

use hdrstack_core::{Error, PixelBuffer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult};

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Nearest-neighbor (no interpolation).
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
}

impl Filter {
    /// Support radius of the kernel at scale 1.
    #[inline]
    pub fn support(&self) -> f32 {
        match self {
            Filter::Nearest => 0.5,
            Filter::Bilinear => 1.0,
        }
    }

    /// Evaluates the kernel at offset `x`.
    #[inline]
    pub fn weight(&self, x: f32) -> f32 {
        let ax = x.abs();
        match self {
            Filter::Nearest => {
                if ax < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Filter::Bilinear => {
                if ax < 1.0 {
                    1.0 - ax
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Filter::Nearest => "nearest",
            Filter::Bilinear => "bilinear",
        })
    }
}

impl FromStr for Filter {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "point" => Ok(Filter::Nearest),
            "bilinear" | "linear" | "triangle" => Ok(Filter::Bilinear),
            other => Err(OpsError::Settings(format!("unknown filter '{}'", other))),
        }
    }
}

/// Resamples `buffer` to `width` x `height`.
///
/// # Errors
///
/// [`Error::ResolutionMismatch`] if the target size is zero.
pub fn resample(buffer: &PixelBuffer, width: u32, height: u32, filter: Filter) -> OpsResult<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(Error::resolution_mismatch((width, height), buffer.dimensions()).into());
    }
    if buffer.dimensions() == (width, height) {
        return Ok(buffer.clone());
    }
    let data = resize_f32(
        buffer.data(),
        buffer.width() as usize,
        buffer.height() as usize,
        buffer.channels(),
        width as usize,
        height as usize,
        filter,
    )?;
    Ok(PixelBuffer::from_data(width, height, buffer.channels(), data)?)
}

/// Resamples `buffer` to the size of `target`.
pub fn resample_to(buffer: &PixelBuffer, target: &PixelBuffer, filter: Filter) -> OpsResult<PixelBuffer> {
    resample(buffer, target.width(), target.height(), filter)
}

/// Resizes interleaved f32 data.
///
/// Bilinear runs as two separable passes, horizontal then vertical; rows
/// of each pass are processed in parallel.
pub fn resize_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    let expected = src_w * src_h * channels;
    if src.len() != expected || expected == 0 {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} samples, got {}",
            expected,
            src.len()
        )));
    }
    if dst_w == 0 || dst_h == 0 {
        return Err(OpsError::InvalidDimensions("destination size must be > 0".into()));
    }

    Ok(match filter {
        Filter::Nearest => resize_nearest(src, src_w, src_h, channels, dst_w, dst_h),
        Filter::Bilinear => {
            let temp = resize_horizontal(src, src_w, src_h, channels, dst_w, filter);
            resize_vertical(&temp, dst_w, src_h, channels, dst_h, filter)
        }
    })
}

#[inline]
fn nearest_index(dst: usize, scale: f32, len: usize) -> usize {
    (((dst as f32 + 0.5) * scale) as usize).min(len - 1)
}

fn resize_nearest(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<f32> {
    let sx = src_w as f32 / dst_w as f32;
    let sy = src_h as f32 / dst_h as f32;
    let cols: Vec<usize> = (0..dst_w).map(|x| nearest_index(x, sx, src_w)).collect();
    let mut dst = vec![0.0f32; dst_w * dst_h * channels];

    dst.par_chunks_mut(dst_w * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = nearest_index(y, sy, src_h) * src_w;
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                let idx = (src_row + cols[x]) * channels;
                px.copy_from_slice(&src[idx..idx + channels]);
            }
        });
    dst
}

/// Source taps and weights for one destination coordinate.
fn taps(dst: usize, scale: f32, src_len: usize, filter: Filter) -> (usize, Vec<f32>) {
    let support = filter.support() * scale.max(1.0);
    let center = (dst as f32 + 0.5) * scale - 0.5;
    let first = ((center - support).floor() as isize).max(0) as usize;
    let last = (((center + support).ceil()).max(0.0) as usize).min(src_len - 1);
    let first = first.min(last);

    let mut weights: Vec<f32> = (first..=last)
        .map(|s| filter.weight((s as f32 - center) / scale.max(1.0)))
        .collect();
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        weights.iter_mut().for_each(|w| *w /= sum);
    } else {
        // Target center fell outside every tap; clamp to the nearest edge.
        let edge = if center <= first as f32 { 0 } else { weights.len() - 1 };
        weights[edge] = 1.0;
    }
    (first, weights)
}

fn resize_horizontal(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    filter: Filter,
) -> Vec<f32> {
    let scale = src_w as f32 / dst_w as f32;
    let kernels: Vec<(usize, Vec<f32>)> = (0..dst_w).map(|x| taps(x, scale, src_w, filter)).collect();
    let mut dst = vec![0.0f32; dst_w * src_h * channels];

    dst.par_chunks_mut(dst_w * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src[y * src_w * channels..(y + 1) * src_w * channels];
            for (px, (first, weights)) in row.chunks_exact_mut(channels).zip(&kernels) {
                for (i, w) in weights.iter().enumerate() {
                    let s = (first + i) * channels;
                    for c in 0..channels {
                        px[c] += src_row[s + c] * w;
                    }
                }
            }
        });
    dst
}

fn resize_vertical(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_h: usize,
    filter: Filter,
) -> Vec<f32> {
    let scale = src_h as f32 / dst_h as f32;
    let row_len = src_w * channels;
    let mut dst = vec![0.0f32; row_len * dst_h];

    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let (first, weights) = taps(y, scale, src_h, filter);
            for (i, w) in weights.iter().enumerate() {
                let src_row = &src[(first + i) * row_len..(first + i + 1) * row_len];
                for (d, s) in row.iter_mut().zip(src_row) {
                    *d += s * w;
                }
            }
        });
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_filter_weights() {
        assert_eq!(Filter::Nearest.weight(0.0), 1.0);
        assert_eq!(Filter::Nearest.weight(0.6), 0.0);
        assert_eq!(Filter::Bilinear.weight(0.0), 1.0);
        assert_abs_diff_eq!(Filter::Bilinear.weight(0.5), 0.5);
        assert_eq!(Filter::default(), Filter::Bilinear);
    }

    #[test]
    fn test_same_size_is_identity() {
        let data: Vec<f32> = (0..12).map(|v| v as f32 * 0.1).collect();
        let buf = PixelBuffer::from_data(2, 2, 3, data).unwrap();
        for filter in [Filter::Nearest, Filter::Bilinear] {
            assert_eq!(resample(&buf, 2, 2, filter).unwrap(), buf);
        }
    }

    #[test]
    fn test_constant_stays_constant() {
        let buf = PixelBuffer::filled(3, 5, &[0.25]);
        for filter in [Filter::Nearest, Filter::Bilinear] {
            for (w, h) in [(7, 11), (1, 1), (2, 9)] {
                let out = resample(&buf, w, h, filter).unwrap();
                assert_eq!(out.dimensions(), (w, h));
                for v in out.data() {
                    assert_abs_diff_eq!(*v, 0.25, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_nearest_upscale_duplicates() {
        let buf = PixelBuffer::from_data(2, 1, 1, vec![0.0, 1.0]).unwrap();
        let out = resample(&buf, 4, 2, Filter::Nearest).unwrap();
        assert_eq!(out.data(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bilinear_interpolates() {
        let buf = PixelBuffer::from_data(2, 1, 1, vec![0.0, 1.0]).unwrap();
        let out = resample(&buf, 4, 1, Filter::Bilinear).unwrap();
        let d = out.data();
        assert_abs_diff_eq!(d[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(d[2], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(d[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_downscale_is_symmetric() {
        let buf = PixelBuffer::from_data(4, 1, 1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let out = resample(&buf, 2, 1, Filter::Bilinear).unwrap();
        let d = out.data();
        assert!(d[0] < d[1]);
        assert!(d[0] > 0.0 && d[1] < 1.0);
        assert_abs_diff_eq!(d[0] + d[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_target_is_resolution_error() {
        let buf = PixelBuffer::filled(2, 2, &[1.0]);
        let err = resample(&buf, 0, 2, Filter::Bilinear).unwrap_err();
        assert!(matches!(err, OpsError::Core(ref e) if e.is_resolution_error()));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("Nearest".parse::<Filter>().unwrap(), Filter::Nearest);
        assert_eq!("linear".parse::<Filter>().unwrap(), Filter::Bilinear);
        assert!("lanczos".parse::<Filter>().is_err());
    }
}
