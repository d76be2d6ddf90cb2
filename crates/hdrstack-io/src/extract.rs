//! Layer extraction.
//!
//! [`extract_layers`] turns any [`DecodedAsset`] into a [`LayerSet`]: the
//! mandatory base buffer plus each optional layer resolved independently.
//!
//! | Layer | Source |
//! |-------|--------|
//! | gain map | first id under a tag ending in `hdrgainmap` |
//! | depth | first depth image |
//! | mattes | every id under every tag containing `matte`, tag then id order |
//! | headroom | info `HDRGainMapHeadroom`, else XMP `HDRGainMap:HDRGainMapHeadroom` |
//!
//! A failing optional layer becomes a [`LayerWarning`] and is left out.
//! Only a missing or undecodable base image is an error.

use std::fmt;

use hdrstack_core::{Headroom, PixelBuffer};
use tracing::{debug, warn};

use crate::asset::{AuxId, DecodedAsset};
use crate::{IoError, IoResult};

/// Tag suffix identifying the gain map.
pub const GAINMAP_TAG_SUFFIX: &str = "hdrgainmap";
/// Tag fragment identifying mattes.
pub const MATTE_TAG_FRAGMENT: &str = "matte";

/// One auxiliary mask and the tag it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Matte {
    /// Last `:` segment of the type tag (`semanticskinmatte`).
    pub tag: String,
    /// Container item id.
    pub id: AuxId,
    /// Single-channel samples.
    pub buffer: PixelBuffer,
}

/// A non-fatal problem with one optional layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerWarning {
    /// Layer label (`gainmap`, `depth`, `matte semanticskinmatte#7`, `headroom`).
    pub layer: String,
    /// Human-readable cause.
    pub reason: String,
}

impl LayerWarning {
    /// Creates a warning and emits it as a `warn!` event.
    pub fn emit(layer: impl Into<String>, reason: impl ToString) -> Self {
        let w = Self {
            layer: layer.into(),
            reason: reason.to_string(),
        };
        warn!(layer = %w.layer, reason = %w.reason, "optional layer dropped");
        w
    }
}

impl fmt::Display for LayerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.layer, self.reason)
    }
}

/// Everything extracted from one asset.
#[derive(Debug, Clone)]
pub struct LayerSet {
    /// 3-channel base, normalized, still in its encoded colorspace.
    pub base: PixelBuffer,
    /// 1-channel gain map at its native resolution.
    pub gainmap: Option<PixelBuffer>,
    /// 1-channel depth map at its native resolution.
    pub depth: Option<PixelBuffer>,
    /// Mattes in extraction order.
    pub mattes: Vec<Matte>,
    /// Validated headroom.
    pub headroom: Option<Headroom>,
    /// Optional layers that were dropped.
    pub warnings: Vec<LayerWarning>,
}

impl LayerSet {
    /// Layer set with only a base image.
    pub fn from_base(base: PixelBuffer) -> Self {
        Self {
            base,
            gainmap: None,
            depth: None,
            mattes: Vec::new(),
            headroom: None,
            warnings: Vec::new(),
        }
    }
}

/// Last `:` segment of a type tag.
pub fn tag_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

/// `true` for gain map type tags.
pub fn is_gainmap_tag(tag: &str) -> bool {
    tag.to_ascii_lowercase().ends_with(GAINMAP_TAG_SUFFIX)
}

/// `true` for matte type tags.
pub fn is_matte_tag(tag: &str) -> bool {
    tag.to_ascii_lowercase().contains(MATTE_TAG_FRAGMENT)
}

/// Runs the extractor over an asset.
///
/// # Errors
///
/// [`IoError::MissingBase`] when the primary image cannot be obtained or
/// normalized. Every other failure is recorded in [`LayerSet::warnings`].
pub fn extract_layers(asset: &dyn DecodedAsset) -> IoResult<LayerSet> {
    let base = asset
        .primary()
        .and_then(|raw| raw.to_buffer_channels(3))
        .map_err(|e| match e {
            IoError::MissingBase(_) => e,
            other => IoError::MissingBase(other.to_string()),
        })?;
    debug!(width = base.width(), height = base.height(), "base extracted");

    let mut set = LayerSet::from_base(base);
    let aux = asset.aux_types();

    if let Some((tag, ids)) = aux.iter().find(|(tag, _)| is_gainmap_tag(tag)) {
        match ids.first() {
            Some(&id) => match asset.aux_image(id).and_then(|raw| raw.to_buffer_channels(1)) {
                Ok(buf) => {
                    debug!(id, width = buf.width(), height = buf.height(), "gain map extracted");
                    set.gainmap = Some(buf);
                }
                Err(e) => set.warnings.push(LayerWarning::emit("gainmap", e)),
            },
            None => set
                .warnings
                .push(LayerWarning::emit("gainmap", format!("tag '{}' lists no items", tag))),
        }
    }

    if let Some(first) = asset.depth_images().into_iter().next() {
        match first.and_then(|raw| raw.to_buffer_channels(1)) {
            Ok(buf) => {
                debug!(width = buf.width(), height = buf.height(), "depth extracted");
                set.depth = Some(buf);
            }
            Err(e) => set.warnings.push(LayerWarning::emit("depth", e)),
        }
    }

    for (tag, ids) in aux.iter().filter(|(tag, _)| is_matte_tag(tag)) {
        let name = tag_name(tag);
        for &id in ids {
            match asset.aux_image(id).and_then(|raw| raw.to_buffer_channels(1)) {
                Ok(buffer) => {
                    debug!(tag = name, id, "matte extracted");
                    set.mattes.push(Matte {
                        tag: name.to_string(),
                        id,
                        buffer,
                    });
                }
                Err(e) => set
                    .warnings
                    .push(LayerWarning::emit(format!("matte {}#{}", name, id), e)),
            }
        }
    }

    if let Some(raw) = asset.headroom() {
        match Headroom::new(raw as f32) {
            Ok(h) => set.headroom = Some(h),
            Err(e) => set.warnings.push(LayerWarning::emit("headroom", e)),
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAsset;
    use crate::raw::{PixelMode, RawImage};

    const GAIN_TAG: &str = "urn:com:apple:photo:2020:aux:hdrgainmap";
    const SKIN_TAG: &str = "urn:com:apple:photo:2020:aux:semanticskinmatte";
    const HAIR_TAG: &str = "urn:com:apple:photo:2020:aux:semantichairmatte";

    fn rgb(w: u32, h: u32) -> RawImage {
        RawImage::packed(PixelMode::Rgb, w, h, vec![255; (w * h * 3) as usize]).unwrap()
    }

    fn luma(w: u32, h: u32, v: u8) -> RawImage {
        RawImage::packed(PixelMode::L, w, h, vec![v; (w * h) as usize]).unwrap()
    }

    #[test]
    fn test_full_asset() {
        let asset = MemoryAsset::new(rgb(4, 4))
            .with_aux(GAIN_TAG, 50, luma(2, 2, 128))
            .with_aux(SKIN_TAG, 7, luma(2, 2, 255))
            .with_aux(HAIR_TAG, 8, luma(2, 2, 0))
            .with_aux("urn:com:apple:photo:2020:aux:other", 9, luma(2, 2, 0))
            .with_depth(luma(3, 3, 10))
            .with_headroom(3.0);

        let set = extract_layers(&asset).unwrap();
        assert_eq!(set.base.channels(), 3);
        assert_eq!(set.gainmap.as_ref().unwrap().dimensions(), (2, 2));
        assert_eq!(set.depth.as_ref().unwrap().dimensions(), (3, 3));
        let tags: Vec<_> = set.mattes.iter().map(|m| m.tag.as_str()).collect();
        assert_eq!(tags, vec!["semanticskinmatte", "semantichairmatte"]);
        assert_eq!(set.headroom.unwrap().get(), 3.0);
        assert!(set.warnings.is_empty());
    }

    #[test]
    fn test_base_only() {
        let set = extract_layers(&MemoryAsset::new(rgb(2, 2))).unwrap();
        assert!(set.gainmap.is_none());
        assert!(set.depth.is_none());
        assert!(set.mattes.is_empty());
        assert!(set.headroom.is_none());
        assert!(set.warnings.is_empty());
    }

    #[test]
    fn test_missing_base_is_fatal() {
        let err = extract_layers(&MemoryAsset::without_primary()).unwrap_err();
        assert!(matches!(err, IoError::MissingBase(_)));

        let grey = MemoryAsset::new(luma(2, 2, 0));
        assert!(matches!(extract_layers(&grey), Err(IoError::MissingBase(_))));
    }

    #[test]
    fn test_broken_layers_become_warnings() {
        let asset = MemoryAsset::new(rgb(2, 2))
            .with_missing_aux(GAIN_TAG, 50)
            .with_aux(SKIN_TAG, 7, luma(2, 2, 255))
            .with_missing_aux(SKIN_TAG, 8)
            .with_headroom(0.5);
        let set = extract_layers(&asset).unwrap();
        assert!(set.gainmap.is_none());
        assert_eq!(set.mattes.len(), 1);
        assert!(set.headroom.is_none());
        let layers: Vec<_> = set.warnings.iter().map(|w| w.layer.as_str()).collect();
        assert_eq!(layers, vec!["gainmap", "matte semanticskinmatte#8", "headroom"]);
    }

    #[test]
    fn test_rgba_base_drops_alpha() {
        let raw = RawImage::packed(PixelMode::Rgba, 1, 1, vec![255, 0, 0, 7]).unwrap();
        let set = extract_layers(&MemoryAsset::new(raw)).unwrap();
        assert_eq!(set.base.data(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_tag_helpers() {
        assert!(is_gainmap_tag(GAIN_TAG));
        assert!(!is_gainmap_tag("urn:x:hdrgainmap:extra"));
        assert!(is_matte_tag("urn:x:PortraitEffectsMatte"));
        assert_eq!(tag_name(SKIN_TAG), "semanticskinmatte");
        assert_eq!(tag_name("plain"), "plain");
    }
}
