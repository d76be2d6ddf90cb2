//! Color transform chains.
//!
//! A chain is built from named [`TransformRequest`]s, resolved against a
//! [`ColorConfig`] into primitive [`ColorTransform`] steps, then applied to
//! a [`PixelBuffer`]. Steps compose left to right.
//!
//! Operations are applied in order:
//!
//! 1. Curve decode (encoded -> linear)
//! 2. Gamut conversion (3x3 matrix on the first three channels)
//! 3. Curve encode (linear -> encoded)
//!
//! # Example
//!
//! ```rust
//! use hdrstack_color::{ColorConfig, TransformChain, TransformRequest};
//! use hdrstack_core::PixelBuffer;
//!
//! let config = ColorConfig::builtin();
//! let chain = TransformChain::resolve(&config, &TransformRequest::base_chain()).unwrap();
//! let base = PixelBuffer::filled(2, 2, &[1.0, 1.0, 1.0]);
//! let linear = chain.apply(&base).unwrap();
//! assert!((linear.pixel(0, 0)[1] - 1.0).abs() < 1e-3);
//! ```

use std::fmt;

use glam::{Mat3, Vec3};
use hdrstack_core::{Error, PixelBuffer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{ColorConfig, Direction};
use crate::primaries::{gamut_matrix, Gamut};
use crate::transfer::Curve;
use crate::{ColorError, ColorResult};

/// A transform addressed by config names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformRequest {
    /// Colorspace to colorspace conversion.
    ColorConvert {
        /// Source colorspace name.
        from: String,
        /// Target colorspace name.
        to: String,
    },
    /// Curve-only transform addressed by one name.
    NamedTransform {
        /// Named transform name.
        name: String,
    },
}

impl TransformRequest {
    /// Shorthand for [`TransformRequest::ColorConvert`].
    pub fn convert(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ColorConvert {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Shorthand for [`TransformRequest::NamedTransform`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::NamedTransform { name: name.into() }
    }

    /// Parses a YAML list of `color_convert: {..}` / `named_transform: {..}` entries.
    pub fn list_from_yaml(yaml: &str) -> ColorResult<Vec<TransformRequest>> {
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(
            serde_yaml::Deserializer::from_str(yaml),
        )?)
    }

    /// Base image chain: sRGB curve decode, then P3-D65 to ACEScg.
    pub fn base_chain() -> Vec<TransformRequest> {
        vec![
            Self::convert("sRGB - Texture", "Linear Rec.709 (sRGB)"),
            Self::convert("Linear P3-D65", "ACES - ACEScg"),
        ]
    }

    /// Gain map chain: Rec.709 curve decode.
    pub fn gainmap_chain() -> Vec<TransformRequest> {
        vec![Self::named("Rec.709 - Curve")]
    }
}

impl fmt::Display for TransformRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorConvert { from, to } => write!(f, "'{}' -> '{}'", from, to),
            Self::NamedTransform { name } => write!(f, "named '{}'", name),
        }
    }
}

/// A primitive, config-independent transform step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorTransform {
    /// Encoded to linear on every channel.
    CurveDecode(Curve),
    /// Linear to encoded on every channel.
    CurveEncode(Curve),
    /// Linear gamut change on the first three channels.
    GamutConvert {
        /// Source gamut.
        from: Gamut,
        /// Target gamut.
        to: Gamut,
    },
}

impl ColorTransform {
    /// Resolves one request into zero or more primitives.
    ///
    /// Conversions touching a data colorspace, and conversions between
    /// identical definitions, resolve to nothing.
    pub fn resolve(config: &ColorConfig, request: &TransformRequest) -> ColorResult<Vec<ColorTransform>> {
        match request {
            TransformRequest::NamedTransform { name } => {
                let nt = config.named_transform(name)?;
                if nt.curve.is_linear() {
                    return Ok(Vec::new());
                }
                Ok(vec![match nt.direction {
                    Direction::Decode => ColorTransform::CurveDecode(nt.curve),
                    Direction::Encode => ColorTransform::CurveEncode(nt.curve),
                }])
            }
            TransformRequest::ColorConvert { from, to } => {
                let src = config.colorspace(from)?;
                let dst = config.colorspace(to)?;
                if src.data || dst.data {
                    if src.data != dst.data {
                        return Err(ColorError::UnsupportedConversion {
                            from: src.name.clone(),
                            to: dst.name.clone(),
                        });
                    }
                    return Ok(Vec::new());
                }
                let (Some(src_gamut), Some(dst_gamut)) = (src.gamut, dst.gamut) else {
                    return Err(ColorError::UnsupportedConversion {
                        from: src.name.clone(),
                        to: dst.name.clone(),
                    });
                };

                let mut steps = Vec::with_capacity(3);
                if src_gamut == dst_gamut && src.curve == dst.curve {
                    return Ok(steps);
                }
                if !src.curve.is_linear() {
                    steps.push(ColorTransform::CurveDecode(src.curve));
                }
                if src_gamut != dst_gamut {
                    steps.push(ColorTransform::GamutConvert {
                        from: src_gamut,
                        to: dst_gamut,
                    });
                }
                if !dst.curve.is_linear() {
                    steps.push(ColorTransform::CurveEncode(dst.curve));
                }
                Ok(steps)
            }
        }
    }

    fn min_channels(self) -> usize {
        match self {
            ColorTransform::GamutConvert { .. } => 3,
            _ => 1,
        }
    }
}

/// Resolved step plus its precomputed matrix.
#[derive(Debug, Clone, Copy)]
enum Op {
    Decode(Curve),
    Encode(Curve),
    Matrix(Mat3),
}

impl From<ColorTransform> for Op {
    fn from(t: ColorTransform) -> Self {
        match t {
            ColorTransform::CurveDecode(c) => Op::Decode(c),
            ColorTransform::CurveEncode(c) => Op::Encode(c),
            ColorTransform::GamutConvert { from, to } => Op::Matrix(gamut_matrix(from, to)),
        }
    }
}

/// An ordered, resolved sequence of transforms.
#[derive(Debug, Clone, Default)]
pub struct TransformChain {
    steps: Vec<ColorTransform>,
    ops: Vec<Op>,
}

impl TransformChain {
    /// Builds a chain directly from primitives.
    pub fn from_steps(steps: Vec<ColorTransform>) -> Self {
        let ops = steps.iter().copied().map(Op::from).collect();
        Self { steps, ops }
    }

    /// Resolves named requests against a config.
    ///
    /// # Errors
    ///
    /// Unknown names and unsupported conversions.
    pub fn resolve(config: &ColorConfig, requests: &[TransformRequest]) -> ColorResult<Self> {
        let mut steps = Vec::new();
        for req in requests {
            let resolved = ColorTransform::resolve(config, req)?;
            trace!(request = %req, steps = ?resolved, "resolved transform");
            steps.extend(resolved);
        }
        Ok(Self::from_steps(steps))
    }

    /// Primitive steps in application order.
    pub fn steps(&self) -> &[ColorTransform] {
        &self.steps
    }

    /// `true` if the chain does nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fewest channels a buffer needs for this chain.
    pub fn min_channels(&self) -> usize {
        self.steps.iter().map(|s| s.min_channels()).max().unwrap_or(1)
    }

    /// Applies the chain to a copy of `input`.
    ///
    /// Rows are processed in parallel; each pixel is independent so the
    /// result does not depend on scheduling.
    ///
    /// # Errors
    ///
    /// [`ColorError::Core`] with a channel mismatch when a gamut step meets
    /// a buffer with fewer than three channels.
    pub fn apply(&self, input: &PixelBuffer) -> ColorResult<PixelBuffer> {
        let mut out = input.clone();
        self.apply_in_place(&mut out)?;
        Ok(out)
    }

    /// Applies the chain in place.
    pub fn apply_in_place(&self, buffer: &mut PixelBuffer) -> ColorResult<()> {
        let channels = buffer.channels();
        let needed = self.min_channels();
        if channels < needed {
            return Err(Error::channel_mismatch(needed, channels).into());
        }
        if self.ops.is_empty() {
            return Ok(());
        }
        let row_len = buffer.row_len();
        let ops = &self.ops;
        buffer.data_mut().par_chunks_mut(row_len).for_each(|row| {
            for px in row.chunks_exact_mut(channels) {
                for op in ops {
                    apply_op(*op, px);
                }
            }
        });
        Ok(())
    }
}

#[inline]
fn apply_op(op: Op, px: &mut [f32]) {
    match op {
        Op::Decode(c) => px.iter_mut().for_each(|v| *v = c.decode(*v)),
        Op::Encode(c) => px.iter_mut().for_each(|v| *v = c.encode(*v)),
        Op::Matrix(m) => {
            let v = m * Vec3::new(px[0], px[1], px[2]);
            px[0] = v.x;
            px[1] = v.y;
            px[2] = v.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_base_chain_resolves() {
        let cfg = ColorConfig::builtin();
        let chain = TransformChain::resolve(&cfg, &TransformRequest::base_chain()).unwrap();
        assert_eq!(
            chain.steps(),
            &[
                ColorTransform::CurveDecode(Curve::Srgb),
                ColorTransform::GamutConvert {
                    from: Gamut::P3D65,
                    to: Gamut::AcesAp1
                },
            ]
        );
        assert_eq!(chain.min_channels(), 3);
    }

    #[test]
    fn test_gainmap_chain_resolves() {
        let cfg = ColorConfig::builtin();
        let chain = TransformChain::resolve(&cfg, &TransformRequest::gainmap_chain()).unwrap();
        assert_eq!(chain.steps(), &[ColorTransform::CurveDecode(Curve::Rec709)]);
        assert_eq!(chain.min_channels(), 1);
    }

    #[test]
    fn test_unknown_names() {
        let cfg = ColorConfig::builtin();
        let err = TransformChain::resolve(&cfg, &[TransformRequest::convert("nope", "ACEScg")]).unwrap_err();
        assert!(matches!(err, ColorError::UnknownColorspace(_)));
        let err = TransformChain::resolve(&cfg, &[TransformRequest::named("nope")]).unwrap_err();
        assert!(matches!(err, ColorError::UnknownNamedTransform(_)));
    }

    #[test]
    fn test_data_is_passthrough() {
        let cfg = ColorConfig::builtin();
        let steps = ColorTransform::resolve(&cfg, &TransformRequest::convert("Raw", "data")).unwrap();
        assert!(steps.is_empty());
        assert!(ColorTransform::resolve(&cfg, &TransformRequest::convert("Raw", "ACEScg")).is_err());
    }

    #[test]
    fn test_encode_after_gamut() {
        let cfg = ColorConfig::builtin();
        let steps =
            ColorTransform::resolve(&cfg, &TransformRequest::convert("ACEScg", "sRGB - Texture")).unwrap();
        assert_eq!(
            steps,
            vec![
                ColorTransform::GamutConvert {
                    from: Gamut::AcesAp1,
                    to: Gamut::Rec709
                },
                ColorTransform::CurveEncode(Curve::Srgb),
            ]
        );
    }

    #[test]
    fn test_apply_white_stays_white() {
        let cfg = ColorConfig::builtin();
        let chain = TransformChain::resolve(&cfg, &TransformRequest::base_chain()).unwrap();
        let out = chain.apply(&PixelBuffer::filled(3, 2, &[1.0, 1.0, 1.0])).unwrap();
        for v in out.data() {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 2e-3);
        }
    }

    #[test]
    fn test_apply_gainmap_single_channel() {
        let cfg = ColorConfig::builtin();
        let chain = TransformChain::resolve(&cfg, &TransformRequest::gainmap_chain()).unwrap();
        let gm = PixelBuffer::from_data(2, 1, 1, vec![0.0, 1.0]).unwrap();
        let out = chain.apply(&gm).unwrap();
        assert_eq!(out.pixel(0, 0)[0], 0.0);
        assert_abs_diff_eq!(out.pixel(1, 0)[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_gamut_needs_three_channels() {
        let chain = TransformChain::from_steps(vec![ColorTransform::GamutConvert {
            from: Gamut::Rec709,
            to: Gamut::AcesAp1,
        }]);
        let gm = PixelBuffer::filled(2, 2, &[0.5]);
        assert!(matches!(chain.apply(&gm), Err(ColorError::Core(_))));
    }

    #[test]
    fn test_deterministic() {
        let cfg = ColorConfig::builtin();
        let chain = TransformChain::resolve(&cfg, &TransformRequest::base_chain()).unwrap();
        let data: Vec<f32> = (0..64 * 48 * 3).map(|i| (i % 97) as f32 / 96.0).collect();
        let buf = PixelBuffer::from_data(64, 48, 3, data).unwrap();
        assert_eq!(chain.apply(&buf).unwrap(), chain.apply(&buf).unwrap());
    }

    #[test]
    fn test_request_yaml() {
        let yaml = "- color_convert: { from: a, to: b }\n- named_transform: { name: c }\n";
        let reqs = TransformRequest::list_from_yaml(yaml).unwrap();
        assert_eq!(reqs, vec![TransformRequest::convert("a", "b"), TransformRequest::named("c")]);
    }
}
