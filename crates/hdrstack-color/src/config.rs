//! Color configuration: the catalogue of named colorspaces and transforms.
//!
//! Transform requests name colorspaces the way a studio OCIO config does
//! (`sRGB - Texture`, `ACES - ACEScg`). A [`ColorConfig`] resolves those
//! names to a gamut and a transfer curve. The built-in config covers every
//! name the default chains use; a YAML file can replace it.
//!
//! # YAML layout
//!
//! ```yaml
//! name: my-config
//! colorspaces:
//!   - name: sRGB - Texture
//!     aliases: [srgb_tx]
//!     gamut: rec709
//!     curve: srgb
//!   - name: Raw
//!     data: true
//! named_transforms:
//!   - name: Rec.709 - Curve
//!     curve: rec709
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::primaries::Gamut;
use crate::transfer::Curve;
use crate::{ColorError, ColorResult};

/// One colorspace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSpaceDef {
    /// Canonical name.
    pub name: String,
    /// Alternative names accepted on lookup.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// RGB gamut; absent for data colorspaces.
    #[serde(default)]
    pub gamut: Option<Gamut>,
    /// Encoding curve.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub curve: Curve,
    /// Non-color data; conversions to or from it are pass-through.
    #[serde(default)]
    pub data: bool,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ColorSpaceDef {
    fn new(name: &str, gamut: Gamut, curve: Curve) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            gamut: Some(gamut),
            curve,
            data: false,
            description: String::new(),
        }
    }

    fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Which way a named transform's curve is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Encoded to linear.
    #[default]
    Decode,
    /// Linear to encoded.
    Encode,
}

/// A curve-only transform addressed by a single name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTransformDef {
    /// Canonical name.
    pub name: String,
    /// Alternative names accepted on lookup.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Curve the transform applies.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub curve: Curve,
    /// Direction of application.
    #[serde(default)]
    pub direction: Direction,
}

impl NamedTransformDef {
    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Colorspace and named-transform catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Display name of the config.
    #[serde(default)]
    pub name: String,
    /// Colorspaces in declaration order.
    #[serde(default)]
    pub colorspaces: Vec<ColorSpaceDef>,
    /// Named transforms in declaration order.
    #[serde(default)]
    pub named_transforms: Vec<NamedTransformDef>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ColorConfig {
    /// Built-in catalogue with the ACES studio names.
    pub fn builtin() -> Self {
        let colorspaces = vec![
            ColorSpaceDef::new("ACES - ACEScg", Gamut::AcesAp1, Curve::Linear)
                .with_aliases(&["ACEScg", "lin_ap1", "scene_linear"]),
            ColorSpaceDef::new("ACES - ACES2065-1", Gamut::AcesAp0, Curve::Linear)
                .with_aliases(&["ACES2065-1", "aces", "lin_ap0"]),
            ColorSpaceDef::new("Linear Rec.709 (sRGB)", Gamut::Rec709, Curve::Linear)
                .with_aliases(&["lin_rec709", "lin_srgb", "Linear sRGB"]),
            ColorSpaceDef::new("Linear P3-D65", Gamut::P3D65, Curve::Linear)
                .with_aliases(&["lin_p3d65"]),
            ColorSpaceDef::new("Linear Rec.2020", Gamut::Rec2020, Curve::Linear)
                .with_aliases(&["lin_rec2020"]),
            ColorSpaceDef::new("sRGB - Texture", Gamut::Rec709, Curve::Srgb)
                .with_aliases(&["srgb_tx", "sRGB"]),
            ColorSpaceDef::new("sRGB Encoded P3-D65", Gamut::P3D65, Curve::Srgb)
                .with_aliases(&["srgb_p3d65", "Display P3"]),
            ColorSpaceDef::new("Rec.709 - Display", Gamut::Rec709, Curve::Gamma(2.4))
                .with_aliases(&["rec1886_rec709"]),
            ColorSpaceDef {
                name: "Raw".to_string(),
                aliases: vec!["data".to_string(), "Utility - Raw".to_string()],
                gamut: None,
                curve: Curve::Linear,
                data: true,
                description: String::new(),
            },
        ];
        let named_transforms = vec![
            NamedTransformDef {
                name: "Rec.709 - Curve".to_string(),
                aliases: vec!["rec709_crv".to_string()],
                curve: Curve::Rec709,
                direction: Direction::Decode,
            },
            NamedTransformDef {
                name: "sRGB - Curve".to_string(),
                aliases: vec!["srgb_crv".to_string()],
                curve: Curve::Srgb,
                direction: Direction::Decode,
            },
            NamedTransformDef {
                name: "Gamma 2.2 - Curve".to_string(),
                aliases: vec!["g22_crv".to_string()],
                curve: Curve::Gamma(2.2),
                direction: Direction::Decode,
            },
        ];
        Self {
            name: "builtin".to_string(),
            colorspaces,
            named_transforms,
        }
    }

    /// Parses a YAML config.
    pub fn from_yaml_str(yaml: &str) -> ColorResult<Self> {
        let config: ColorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        debug!(
            name = %config.name,
            colorspaces = config.colorspaces.len(),
            named_transforms = config.named_transforms.len(),
            "loaded color config"
        );
        Ok(config)
    }

    /// Reads and parses a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> ColorResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Rejects duplicate names and gamut-less non-data colorspaces.
    pub fn validate(&self) -> ColorResult<()> {
        let mut seen: Vec<String> = Vec::new();
        for cs in &self.colorspaces {
            if cs.gamut.is_none() && !cs.data {
                return Err(ColorError::InvalidConfig(format!(
                    "colorspace '{}' has no gamut and is not marked as data",
                    cs.name
                )));
            }
            for n in std::iter::once(&cs.name).chain(cs.aliases.iter()) {
                let key = n.to_ascii_lowercase();
                if seen.contains(&key) {
                    return Err(ColorError::InvalidConfig(format!("duplicate colorspace name '{}'", n)));
                }
                seen.push(key);
            }
        }
        let mut seen: Vec<String> = Vec::new();
        for nt in &self.named_transforms {
            let key = nt.name.to_ascii_lowercase();
            if seen.contains(&key) {
                return Err(ColorError::InvalidConfig(format!(
                    "duplicate named transform '{}'",
                    nt.name
                )));
            }
            seen.push(key);
        }
        Ok(())
    }

    /// Case-insensitive, alias-aware colorspace lookup.
    pub fn colorspace(&self, name: &str) -> ColorResult<&ColorSpaceDef> {
        self.colorspaces
            .iter()
            .find(|cs| cs.matches(name))
            .ok_or_else(|| ColorError::UnknownColorspace(name.to_string()))
    }

    /// Case-insensitive, alias-aware named transform lookup.
    pub fn named_transform(&self, name: &str) -> ColorResult<&NamedTransformDef> {
        self.named_transforms
            .iter()
            .find(|nt| nt.matches(name))
            .ok_or_else(|| ColorError::UnknownNamedTransform(name.to_string()))
    }

    /// `true` if a colorspace with this name or alias exists.
    pub fn has_colorspace(&self, name: &str) -> bool {
        self.colorspace(name).is_ok()
    }

    /// Canonical colorspace names.
    pub fn colorspace_names(&self) -> Vec<&str> {
        self.colorspaces.iter().map(|c| c.name.as_str()).collect()
    }

    /// Canonical named transform names.
    pub fn named_transform_names(&self) -> Vec<&str> {
        self.named_transforms.iter().map(|n| n.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_has_chain_names() {
        let cfg = ColorConfig::builtin();
        cfg.validate().unwrap();
        for name in ["sRGB - Texture", "Linear Rec.709 (sRGB)", "Linear P3-D65", "ACES - ACEScg"] {
            assert!(cfg.has_colorspace(name), "{}", name);
        }
        assert_eq!(cfg.named_transform("Rec.709 - Curve").unwrap().curve, Curve::Rec709);
    }

    #[test]
    fn test_lookup_case_and_alias() {
        let cfg = ColorConfig::builtin();
        assert_eq!(cfg.colorspace("acescg").unwrap().name, "ACES - ACEScg");
        assert_eq!(cfg.colorspace("SRGB - TEXTURE").unwrap().curve, Curve::Srgb);
        assert!(matches!(
            cfg.colorspace("nope"),
            Err(ColorError::UnknownColorspace(_))
        ));
    }

    #[test]
    fn test_yaml_load() {
        let yaml = r#"
name: tiny
colorspaces:
  - name: lin
    gamut: aces_ap1
  - name: enc
    gamut: rec709
    curve: { gamma: 2.2 }
  - name: Raw
    data: true
named_transforms:
  - name: crv
    curve: srgb
    direction: encode
"#;
        let cfg = ColorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.colorspace_names(), vec!["lin", "enc", "Raw"]);
        assert_eq!(cfg.colorspace("enc").unwrap().curve, Curve::Gamma(2.2));
        assert_eq!(cfg.named_transform("CRV").unwrap().direction, Direction::Encode);
    }

    #[test]
    fn test_gamma_curve_survives_roundtrip() {
        let yaml = "named_transforms:\n  - name: g\n    curve:\n      gamma: 2.6\n";
        let cfg = ColorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.named_transform("g").unwrap().curve, Curve::Gamma(2.6));
        let text = serde_yaml::to_string(&cfg).unwrap();
        assert!(text.contains("gamma: 2.6"), "{}", text);
        assert_eq!(ColorConfig::from_yaml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_yaml_rejects_duplicates() {
        let yaml = "colorspaces:\n  - name: a\n    gamut: rec709\n  - name: A\n    gamut: p3_d65\n";
        assert!(matches!(
            ColorConfig::from_yaml_str(yaml),
            Err(ColorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = serde_yaml::to_string(&ColorConfig::builtin()).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let cfg = ColorConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg, ColorConfig::builtin());
    }
}
