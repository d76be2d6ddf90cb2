//! Transfer curves.
//!
//! Each curve maps encoded values to linear light (`decode`) and back
//! (`encode`). Only the curves the reconstruction chains can name are
//! provided; exotic camera logs are out of scope.
//!
//! # Range
//!
//! - Input/Output: [0, 1] nominal; values outside pass through the
//!   linear segment (sRGB, Rec.709) or clamp to 0 (pure gamma)

use serde::{Deserialize, Serialize};
use std::fmt;

/// sRGB EOTF: Decodes sRGB encoded values to linear light.
///
/// # Formula
///
/// ```text
/// if V <= 0.04045:
///     L = V / 12.92
/// else:
///     L = ((V + 0.055) / 1.055)^2.4
/// ```
///
/// # Reference
///
/// IEC 61966-2-1:1999
#[inline]
pub fn srgb_eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB OETF: Encodes linear light to sRGB.
#[inline]
pub fn srgb_oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Rec.709 OETF: Encodes linear to Rec.709.
///
/// # Formula
///
/// ```text
/// if L < 0.018:
///     V = 4.5 * L
/// else:
///     V = 1.099 * L^0.45 - 0.099
/// ```
#[inline]
pub fn rec709_oetf(l: f32) -> f32 {
    if l < 0.018 {
        4.5 * l
    } else {
        1.099 * l.powf(0.45) - 0.099
    }
}

/// Rec.709 inverse OETF: Decodes Rec.709 to scene linear.
///
/// This is the exact inverse of [`rec709_oetf`], not the BT.1886 display EOTF.
#[inline]
pub fn rec709_inverse_oetf(v: f32) -> f32 {
    if v < 0.081 {
        v / 4.5
    } else {
        ((v + 0.099) / 1.099).powf(1.0 / 0.45)
    }
}

/// Pure power decode: `v^gamma`, negatives clamp to 0.
#[inline]
pub fn gamma_decode(v: f32, gamma: f32) -> f32 {
    if v <= 0.0 { 0.0 } else { v.powf(gamma) }
}

/// Pure power encode: `l^(1/gamma)`, negatives clamp to 0.
#[inline]
pub fn gamma_encode(l: f32, gamma: f32) -> f32 {
    if l <= 0.0 { 0.0 } else { l.powf(1.0 / gamma) }
}

/// A transfer curve a colorspace is encoded with.
///
/// Serialized in YAML as `linear`, `srgb`, `rec709` or `{ gamma: 2.2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    /// No curve; values are already linear.
    #[default]
    Linear,
    /// IEC 61966-2-1 piecewise sRGB.
    Srgb,
    /// ITU-R BT.709 camera OETF.
    Rec709,
    /// Pure power law.
    Gamma(f32),
}

impl Curve {
    /// Parses `linear`, `srgb`, `rec709` or `gamma: <g>`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::with::singleton_map::deserialize(serde_yaml::Deserializer::from_str(yaml))
    }

    /// Encoded to linear.
    #[inline]
    pub fn decode(self, v: f32) -> f32 {
        match self {
            Curve::Linear => v,
            Curve::Srgb => srgb_eotf(v),
            Curve::Rec709 => rec709_inverse_oetf(v),
            Curve::Gamma(g) => gamma_decode(v, g),
        }
    }

    /// Linear to encoded.
    #[inline]
    pub fn encode(self, l: f32) -> f32 {
        match self {
            Curve::Linear => l,
            Curve::Srgb => srgb_oetf(l),
            Curve::Rec709 => rec709_oetf(l),
            Curve::Gamma(g) => gamma_encode(l, g),
        }
    }

    /// `true` for [`Curve::Linear`].
    #[inline]
    pub fn is_linear(self) -> bool {
        matches!(self, Curve::Linear)
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::Linear => f.write_str("linear"),
            Curve::Srgb => f.write_str("sRGB"),
            Curve::Rec709 => f.write_str("Rec.709"),
            Curve::Gamma(g) => write!(f, "gamma {}", g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_srgb_roundtrip() {
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = srgb_oetf(srgb_eotf(v));
            assert!((v - back).abs() < 1e-5, "v={}, back={}", v, back);
        }
    }

    #[test]
    fn test_rec709_roundtrip() {
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = rec709_oetf(rec709_inverse_oetf(v));
            assert!((v - back).abs() < 1e-4, "v={}, back={}", v, back);
        }
    }

    #[test]
    fn test_known_points() {
        assert_eq!(Curve::Srgb.decode(0.0), 0.0);
        assert_abs_diff_eq!(Curve::Srgb.decode(1.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(Curve::Srgb.decode(0.5), 0.214, epsilon = 0.001);
        assert_abs_diff_eq!(Curve::Rec709.decode(1.0), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(Curve::Rec709.decode(0.045), 0.01, epsilon = 1e-6);
        assert_abs_diff_eq!(Curve::Gamma(2.2).decode(0.5), 0.2176, epsilon = 1e-3);
        assert_eq!(Curve::Gamma(2.2).decode(-0.5), 0.0);
    }

    #[test]
    fn test_linear_is_identity() {
        for v in [-1.0f32, 0.0, 0.3, 1.0, 7.5] {
            assert_eq!(Curve::Linear.decode(v), v);
            assert_eq!(Curve::Linear.encode(v), v);
        }
    }

    #[test]
    fn test_yaml_forms() {
        let c = Curve::from_yaml_str("srgb").unwrap();
        assert_eq!(c, Curve::Srgb);
        let c = Curve::from_yaml_str("gamma: 2.4").unwrap();
        assert_eq!(c, Curve::Gamma(2.4));
        let c = Curve::from_yaml_str("{ gamma: 2.2 }").unwrap();
        assert_eq!(c, Curve::Gamma(2.2));
    }
}
