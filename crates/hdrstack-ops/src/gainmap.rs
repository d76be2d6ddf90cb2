//! Gain-map HDR reconstruction.
//!
//! Given a linear base `B`, a linear single-channel gain map `G` at the
//! same resolution and a headroom `h`:
//!
//! ```text
//! scale = G * (h - 1) + 1
//! HDR   = B * scale        (scale broadcast to every channel)
//! ```
//!
//! Gain values are used as-is; values outside `[0, 1]` extrapolate.

use hdrstack_core::{Error, Headroom, PixelBuffer};
use rayon::prelude::*;
use tracing::debug;

use crate::OpsResult;

/// Per-pixel multiplier for gain `g`.
#[inline]
pub fn gain_scale(g: f32, headroom: Headroom) -> f32 {
    headroom.multiplier(g)
}

/// Reconstructs the HDR buffer.
///
/// Returns a copy of `base` when `gain` is `None` or the headroom is
/// exactly 1.0, so both cases are bit-identical to the input.
///
/// # Errors
///
/// - [`Error::ChannelMismatch`] unless `base` has 3 channels and `gain` has 1
/// - [`Error::ResolutionMismatch`] if `gain` is not at the base resolution
///
/// # Example
///
/// ```rust
/// use hdrstack_core::{Headroom, PixelBuffer};
/// use hdrstack_ops::gainmap::reconstruct;
///
/// let base = PixelBuffer::filled(4, 4, &[1.0, 1.0, 1.0]);
/// let gain = PixelBuffer::filled(4, 4, &[0.5]);
/// let hdr = reconstruct(&base, Some(&gain), Headroom::new(3.0).unwrap()).unwrap();
/// assert_eq!(hdr.pixel(3, 3), &[2.0, 2.0, 2.0]);
/// ```
pub fn reconstruct(base: &PixelBuffer, gain: Option<&PixelBuffer>, headroom: Headroom) -> OpsResult<PixelBuffer> {
    if base.channels() != 3 {
        return Err(Error::channel_mismatch(3, base.channels()).into());
    }
    let Some(gain) = gain else {
        debug!("no gain map, HDR equals base");
        return Ok(base.clone());
    };
    if gain.channels() != 1 {
        return Err(Error::channel_mismatch(1, gain.channels()).into());
    }
    if !gain.same_size(base) {
        return Err(Error::resolution_mismatch(base.dimensions(), gain.dimensions()).into());
    }
    if headroom.is_degenerate() {
        debug!("headroom 1.0, HDR equals base");
        return Ok(base.clone());
    }

    let width = base.width() as usize;
    let mut out = base.clone();
    out.data_mut()
        .par_chunks_mut(width * 3)
        .zip(gain.data().par_chunks(width))
        .for_each(|(row, gains)| {
            for (px, &g) in row.chunks_exact_mut(3).zip(gains) {
                let s = gain_scale(g, headroom);
                px[0] *= s;
                px[1] *= s;
                px[2] *= s;
            }
        });

    debug!(headroom = headroom.get(), "HDR reconstructed");
    Ok(out)
}
