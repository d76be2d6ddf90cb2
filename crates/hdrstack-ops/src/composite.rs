//! Layer compositing.
//!
//! [`compose`] assembles the final [`CompositeImage`] in a fixed order:
//!
//! | Channels | Source |
//! |----------|--------|
//! | `R,G,B` | reconstructed HDR |
//! | `sdr.R,sdr.G,sdr.B` | linear base |
//! | `gainmap.R,gainmap.G,gainmap.B` | linear gain map, replicated |
//! | `depth.Y` | depth |
//! | `mattes.<name>.Y` | one per matte, extraction order |
//!
//! `<name>` is the sanitized type tag. When one tag lists several items,
//! each gets its item id appended (`portraiteffects_7`).
//!
//! Optional layers are resampled to the base resolution. A layer that
//! cannot be resampled is dropped with a [`LayerWarning`]; two mattes that
//! still end up with the same name fail the whole composite.

use hdrstack_core::channel::{DEPTH_LAYER, GAINMAP_LAYER, SDR_LAYER};
use hdrstack_core::{sanitize_matte_name, ChannelSpec, CompositeBuilder, CompositeImage, Error, PixelBuffer};
use hdrstack_io::{LayerWarning, Matte};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::resize::{resample, Filter};
use crate::OpsResult;

/// Buffers going into one composite.
#[derive(Debug, Clone, Copy)]
pub struct CompositeInputs<'a> {
    /// Reconstructed HDR, 3 channels, base resolution.
    pub hdr: &'a PixelBuffer,
    /// Linear base, 3 channels, base resolution.
    pub sdr: &'a PixelBuffer,
    /// Linear gain map, 1 channel, any resolution.
    pub gainmap: Option<&'a PixelBuffer>,
    /// Depth, 1 channel, any resolution.
    pub depth: Option<&'a PixelBuffer>,
    /// Mattes in extraction order.
    pub mattes: &'a [Matte],
}

/// A finished composite and the optional layers it had to drop.
#[derive(Debug, Clone)]
pub struct Composed {
    /// The composite.
    pub image: CompositeImage,
    /// Dropped layers.
    pub warnings: Vec<LayerWarning>,
    /// Sanitized names of the mattes that made it in.
    pub matte_names: Vec<String>,
}

/// Warning label of a matte.
pub fn matte_label(matte: &Matte) -> String {
    format!("matte {}#{}", matte.tag, matte.id)
}

/// Sanitizes every matte name and rejects duplicates.
///
/// Returns one entry per matte: the name, or the warning that replaces it.
/// Items sharing a type tag are told apart by their item id.
///
/// # Errors
///
/// [`Error::ChannelCollision`] naming the first repeated channel.
pub fn plan_matte_names(mattes: &[Matte]) -> OpsResult<Vec<Result<String, LayerWarning>>> {
    let mut per_tag: HashMap<&str, usize> = HashMap::new();
    for matte in mattes {
        *per_tag.entry(matte.tag.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    let mut plan = Vec::with_capacity(mattes.len());
    for matte in mattes {
        let shared = per_tag.get(matte.tag.as_str()).is_some_and(|&n| n > 1);
        match sanitize_matte_name(&matte.tag) {
            Ok(name) => {
                let name = if shared { format!("{}_{}", name, matte.id) } else { name };
                if !seen.insert(name.clone()) {
                    return Err(Error::channel_collision(ChannelSpec::matte(&name).name()).into());
                }
                plan.push(Ok(name));
            }
            Err(e) => plan.push(Err(LayerWarning::emit(matte_label(matte), e))),
        }
    }
    Ok(plan)
}

/// Resamples a single-channel layer to `(width, height)`.
fn fit_luma(buffer: &PixelBuffer, width: u32, height: u32, filter: Filter) -> OpsResult<PixelBuffer> {
    if buffer.channels() != 1 {
        return Err(Error::channel_mismatch(1, buffer.channels()).into());
    }
    resample(buffer, width, height, filter)
}

/// Pushes one optional layer, downgrading non-fatal failures.
fn push_optional(warnings: &mut Vec<LayerWarning>, label: &str, result: OpsResult<()>) -> OpsResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warnings.push(LayerWarning::emit(label, e));
            Ok(false)
        }
    }
}

/// Builds the composite.
///
/// # Errors
///
/// - [`Error::ChannelMismatch`] / [`Error::ResolutionMismatch`] if `hdr`
///   and `sdr` are not both 3-channel at the same size
/// - [`Error::ChannelCollision`] if two channels share a name; checked
///   before any optional layer is resampled
///
/// # Example
///
/// ```rust
/// use hdrstack_core::PixelBuffer;
/// use hdrstack_ops::composite::{compose, CompositeInputs};
/// use hdrstack_ops::resize::Filter;
///
/// let hdr = PixelBuffer::filled(4, 4, &[2.0, 2.0, 2.0]);
/// let sdr = PixelBuffer::filled(4, 4, &[1.0, 1.0, 1.0]);
/// let depth = PixelBuffer::filled(2, 2, &[0.3]);
/// let inputs = CompositeInputs { hdr: &hdr, sdr: &sdr, gainmap: None, depth: Some(&depth), mattes: &[] };
/// let out = compose(&inputs, Filter::Bilinear).unwrap();
/// assert_eq!(out.image.channel_names(), vec!["R", "G", "B", "sdr.R", "sdr.G", "sdr.B", "depth.Y"]);
/// ```
pub fn compose(inputs: &CompositeInputs<'_>, filter: Filter) -> OpsResult<Composed> {
    let (width, height) = inputs.hdr.dimensions();
    let matte_plan = plan_matte_names(inputs.mattes)?;

    let mut builder = CompositeBuilder::new(width, height);
    builder.push_buffer(&ChannelSpec::rgb(None), inputs.hdr)?;
    builder.push_buffer(&ChannelSpec::rgb(Some(SDR_LAYER)), inputs.sdr)?;

    let mut warnings = Vec::new();

    if let Some(gain) = inputs.gainmap {
        let result = fit_luma(gain, width, height, filter)
            .and_then(|g| Ok(g.replicate(3)?))
            .and_then(|g| Ok(builder.push_buffer(&ChannelSpec::rgb(Some(GAINMAP_LAYER)), &g)?));
        push_optional(&mut warnings, GAINMAP_LAYER, result)?;
    }

    if let Some(depth) = inputs.depth {
        let result = fit_luma(depth, width, height, filter)
            .and_then(|d| Ok(builder.push_buffer(&[ChannelSpec::luma(DEPTH_LAYER)], &d)?));
        push_optional(&mut warnings, DEPTH_LAYER, result)?;
    }

    let mut matte_names = Vec::new();
    for (matte, planned) in inputs.mattes.iter().zip(matte_plan) {
        let name = match planned {
            Ok(name) => name,
            Err(w) => {
                warnings.push(w);
                continue;
            }
        };
        let result = fit_luma(&matte.buffer, width, height, filter)
            .and_then(|m| Ok(builder.push_buffer(&[ChannelSpec::matte(&name)], &m)?));
        if push_optional(&mut warnings, &matte_label(matte), result)? {
            matte_names.push(name);
        }
    }

    let image = builder.build();
    debug!(
        channels = image.channels().len(),
        warnings = warnings.len(),
        "composite built"
    );
    Ok(Composed {
        image,
        warnings,
        matte_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matte(tag: &str, id: u32, w: u32, h: u32, v: f32) -> Matte {
        Matte {
            tag: tag.to_string(),
            id,
            buffer: PixelBuffer::filled(w, h, &[v]),
        }
    }

    fn rgb(v: f32) -> PixelBuffer {
        PixelBuffer::filled(4, 4, &[v, v, v])
    }

    #[test]
    fn test_full_layout() {
        let (hdr, sdr) = (rgb(2.0), rgb(1.0));
        let gain = PixelBuffer::filled(2, 2, &[0.5]);
        let depth = PixelBuffer::filled(3, 3, &[0.7]);
        let mattes = vec![
            matte("semanticskinmatte", 7, 2, 2, 1.0),
            matte("semantichairmatte", 8, 4, 4, 0.0),
        ];
        let inputs = CompositeInputs {
            hdr: &hdr,
            sdr: &sdr,
            gainmap: Some(&gain),
            depth: Some(&depth),
            mattes: &mattes,
        };
        let out = compose(&inputs, Filter::Bilinear).unwrap();
        assert_eq!(
            out.image.channel_names(),
            vec![
                "R", "G", "B", "sdr.R", "sdr.G", "sdr.B", "gainmap.R", "gainmap.G", "gainmap.B", "depth.Y",
                "mattes.skin.Y", "mattes.hair.Y",
            ]
        );
        assert!(out.warnings.is_empty());
        assert_eq!(out.matte_names, vec!["skin", "hair"]);
        assert!((out.image.sample("gainmap.B", 3, 3).unwrap() - 0.5).abs() < 1e-6);
        assert!((out.image.sample("depth.Y", 0, 0).unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_collision_is_fatal() {
        let (hdr, sdr) = (rgb(1.0), rgb(1.0));
        let mattes = vec![matte("Alpha Matte", 1, 4, 4, 1.0), matte("urn:x:alpha", 2, 4, 4, 0.0)];
        let inputs = CompositeInputs {
            hdr: &hdr,
            sdr: &sdr,
            gainmap: None,
            depth: None,
            mattes: &mattes,
        };
        let err = compose(&inputs, Filter::Bilinear).unwrap_err();
        assert!(err.is_collision());
        assert!(err.to_string().contains("mattes.alpha.Y"));
    }

    #[test]
    fn test_same_tag_items_keep_ids() {
        let (hdr, sdr) = (rgb(1.0), rgb(1.0));
        let mattes = vec![
            matte("portraiteffectsmatte", 7, 4, 4, 1.0),
            matte("portraiteffectsmatte", 8, 4, 4, 0.5),
            matte("semanticskinmatte", 9, 4, 4, 0.0),
        ];
        let inputs = CompositeInputs {
            hdr: &hdr,
            sdr: &sdr,
            gainmap: None,
            depth: None,
            mattes: &mattes,
        };
        let out = compose(&inputs, Filter::Bilinear).unwrap();
        assert_eq!(out.matte_names, vec!["portraiteffects_7", "portraiteffects_8", "skin"]);
        assert_eq!(out.image.sample("mattes.portraiteffects_8.Y", 1, 1), Some(0.5));
    }

    #[test]
    fn test_bad_layers_dropped() {
        let (hdr, sdr) = (rgb(1.0), rgb(1.0));
        let rgb_depth = PixelBuffer::filled(4, 4, &[0.1, 0.2, 0.3]);
        let mattes = vec![matte("urn:x:", 3, 4, 4, 1.0), matte("hairmatte", 4, 4, 4, 1.0)];
        let inputs = CompositeInputs {
            hdr: &hdr,
            sdr: &sdr,
            gainmap: None,
            depth: Some(&rgb_depth),
            mattes: &mattes,
        };
        let out = compose(&inputs, Filter::Nearest).unwrap();
        assert_eq!(out.image.channels().len(), 7);
        assert!(out.image.has_channel("mattes.hair.Y"));
        let labels: Vec<_> = out.warnings.iter().map(|w| w.layer.as_str()).collect();
        assert_eq!(labels, vec!["depth", "matte urn:x:#3"]);
    }

    #[test]
    fn test_mismatched_sdr_is_error() {
        let hdr = rgb(1.0);
        let sdr = PixelBuffer::filled(2, 2, &[1.0, 1.0, 1.0]);
        let inputs = CompositeInputs {
            hdr: &hdr,
            sdr: &sdr,
            gainmap: None,
            depth: None,
            mattes: &[],
        };
        assert!(compose(&inputs, Filter::Bilinear).is_err());
    }
}
