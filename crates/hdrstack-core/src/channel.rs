//! Output channel naming.
//!
//! Every channel of a composited image has a dotted name: an optional layer
//! prefix plus a component (`R`, `sdr.G`, `depth.Y`, `mattes.skin.Y`).
//! Matte prefixes come from container type tags and go through
//! [`sanitize_matte_name`] before use.

use crate::{Error, Result};
use std::fmt;

/// Layer prefix for the SDR working-space copy of the base image.
pub const SDR_LAYER: &str = "sdr";
/// Layer prefix for the linearized gain map.
pub const GAINMAP_LAYER: &str = "gainmap";
/// Layer prefix for the depth map.
pub const DEPTH_LAYER: &str = "depth";
/// Layer prefix under which every matte gets its own sub-layer.
pub const MATTES_LAYER: &str = "mattes";

/// RGB component names.
pub const RGB: [&str; 3] = ["R", "G", "B"];
/// Luminance component name.
pub const LUMA: &str = "Y";

/// A named logical channel: `layer.component` or a bare component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSpec {
    layer: Option<String>,
    component: String,
}

impl ChannelSpec {
    /// Channel without a layer prefix (the main `R,G,B`).
    pub fn bare(component: impl Into<String>) -> Self {
        Self {
            layer: None,
            component: component.into(),
        }
    }

    /// Channel under a layer prefix.
    pub fn layered(layer: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            layer: Some(layer.into()),
            component: component.into(),
        }
    }

    /// `R,G,B` under an optional layer prefix.
    pub fn rgb(layer: Option<&str>) -> [ChannelSpec; 3] {
        RGB.map(|c| match layer {
            Some(l) => Self::layered(l, c),
            None => Self::bare(c),
        })
    }

    /// Single `Y` channel under a layer prefix.
    pub fn luma(layer: impl Into<String>) -> Self {
        Self::layered(layer, LUMA)
    }

    /// `mattes.<name>.Y` for an already-sanitized matte name.
    pub fn matte(name: &str) -> Self {
        Self::layered(format!("{MATTES_LAYER}.{name}"), LUMA)
    }

    /// Layer prefix, if any.
    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    /// Component name.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Full dotted name.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "{}.{}", layer, self.component),
            None => f.write_str(&self.component),
        }
    }
}

/// Splits a dotted channel name into `(layer, component)`.
///
/// `mattes.skin.Y` splits at the last dot into `("mattes.skin", "Y")`.
pub fn split_channel_name(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Turns a matte type tag into a canonical channel-name fragment.
///
/// Steps:
/// 1. keep the part after the last `:` (`urn:...:aux:semanticskinmatte` -> `semanticskinmatte`)
/// 2. lowercase, map anything outside `[a-z0-9_]` to `_`, collapse runs
/// 3. strip a leading `semantic` and a trailing `matte` when something remains
///
/// The result never contains `.`, so it is always a single name segment.
///
/// # Errors
///
/// Returns [`Error::InvalidChannelName`] when nothing usable remains.
///
/// # Example
///
/// ```rust
/// use hdrstack_core::channel::sanitize_matte_name;
///
/// let name = sanitize_matte_name("urn:com:apple:photo:2020:aux:semanticskinmatte").unwrap();
/// assert_eq!(name, "skin");
/// assert_eq!(sanitize_matte_name("Alpha Matte").unwrap(), "alpha");
/// assert!(sanitize_matte_name("urn:x:").is_err());
/// ```
pub fn sanitize_matte_name(tag: &str) -> Result<String> {
    let tail = tag.rsplit(':').next().unwrap_or(tag);

    let mut cleaned = String::with_capacity(tail.len());
    for ch in tail.chars().flat_map(char::to_lowercase) {
        let ch = if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' };
        if ch == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(ch);
    }
    let mut name = cleaned.trim_matches('_');

    if let Some(rest) = name.strip_prefix("semantic") {
        let rest = rest.trim_matches('_');
        if !rest.is_empty() {
            name = rest;
        }
    }
    if let Some(rest) = name.strip_suffix("matte") {
        let rest = rest.trim_matches('_');
        if !rest.is_empty() {
            name = rest;
        }
    }

    if name.is_empty() {
        return Err(Error::invalid_channel_name(tag, "no usable characters"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_names() {
        let rgb = ChannelSpec::rgb(None);
        assert_eq!(rgb[0].name(), "R");
        let sdr = ChannelSpec::rgb(Some(SDR_LAYER));
        assert_eq!(sdr[2].name(), "sdr.B");
        assert_eq!(ChannelSpec::luma(DEPTH_LAYER).name(), "depth.Y");
        assert_eq!(ChannelSpec::matte("hair").name(), "mattes.hair.Y");
    }

    #[test]
    fn test_split() {
        assert_eq!(split_channel_name("R"), (None, "R"));
        assert_eq!(split_channel_name("sdr.R"), (Some("sdr"), "R"));
        assert_eq!(split_channel_name("mattes.skin.Y"), (Some("mattes.skin"), "Y"));
    }

    #[test]
    fn test_sanitize_apple_tags() {
        let cases = [
            ("urn:com:apple:photo:2020:aux:semanticskinmatte", "skin"),
            ("urn:com:apple:photo:2020:aux:semantichairmatte", "hair"),
            ("urn:com:apple:photo:2020:aux:semanticteethmatte", "teeth"),
            ("urn:com:apple:photo:2019:aux:portraiteffectsmatte", "portraiteffects"),
        ];
        for (tag, expected) in cases {
            assert_eq!(sanitize_matte_name(tag).unwrap(), expected, "{}", tag);
        }
    }

    #[test]
    fn test_sanitize_odd_input() {
        assert_eq!(sanitize_matte_name("a.b c").unwrap(), "a_b_c");
        assert_eq!(sanitize_matte_name("matte").unwrap(), "matte");
        assert_eq!(sanitize_matte_name("semantic").unwrap(), "semantic");
        assert_eq!(sanitize_matte_name("__Alpha__").unwrap(), "alpha");
        assert!(sanitize_matte_name("").is_err());
        assert!(sanitize_matte_name("...").is_err());
    }

    #[test]
    fn test_sanitize_collision_source() {
        let a = sanitize_matte_name("alpha").unwrap();
        let b = sanitize_matte_name("urn:vendor:aux:Alpha-Matte").unwrap();
        assert_eq!(a, b);
    }
}
