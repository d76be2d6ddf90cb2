//! Decoded source assets.
//!
//! A [`DecodedAsset`] is whatever a container reader exposes after opening
//! a file: the primary image, auxiliary images grouped by type tag, depth
//! images and a metadata dictionary. The extractor only talks to this
//! trait, so HEIF files, sidecar snapshots and in-memory fixtures are
//! interchangeable.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::raw::RawImage;
use crate::{IoError, IoResult};

/// Identifier of an auxiliary item inside its container.
pub type AuxId = u32;

/// Info dictionary key carrying an explicit headroom value.
pub const HEADROOM_KEY: &str = "HDRGainMapHeadroom";

/// A value in an asset's info dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<InfoValue>),
    /// Nested dictionary.
    Map(BTreeMap<String, InfoValue>),
}

impl InfoValue {
    /// Numeric view of scalars; text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InfoValue::Int(v) => Some(*v as f64),
            InfoValue::Float(v) => Some(*v),
            InfoValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Non-pixel metadata of an asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetMetadata {
    /// Container info dictionary.
    pub info: BTreeMap<String, InfoValue>,
    /// ICC profile of the primary image.
    pub icc_profile: Option<Vec<u8>>,
    /// EXIF block.
    pub exif: Option<Vec<u8>>,
    /// XMP packet of the primary image.
    pub xmp: Option<Vec<u8>>,
}

impl AssetMetadata {
    /// Every XMP packet: the primary one, then byte values under info keys
    /// containing `xmp`.
    pub fn xmp_packets(&self) -> Vec<&[u8]> {
        let mut out: Vec<&[u8]> = self.xmp.iter().map(Vec::as_slice).collect();
        for (key, value) in &self.info {
            if key.to_ascii_lowercase().contains("xmp") {
                if let InfoValue::Bytes(b) = value {
                    out.push(b);
                }
            }
        }
        out
    }
}

/// Where a headroom value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadroomSource {
    /// Explicit info dictionary entry.
    Info,
    /// XMP property.
    Xmp,
}

static XMP_HEADROOM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"HDRGainMap:HDRGainMapHeadroom(?:\s*=\s*["']([^"']*)["']|\s*>\s*([^<]*?)\s*<)"#).ok()
});

/// Finds the raw headroom value, unvalidated.
///
/// The explicit info entry wins; otherwise the first XMP packet carrying
/// `HDRGainMap:HDRGainMapHeadroom` as attribute or element is used.
pub fn discover_headroom(meta: &AssetMetadata) -> Option<(f64, HeadroomSource)> {
    if let Some(v) = meta.info.get(HEADROOM_KEY).and_then(InfoValue::as_f64) {
        return Some((v, HeadroomSource::Info));
    }
    meta.xmp_packets()
        .into_iter()
        .find_map(|packet| parse_xmp_headroom(&String::from_utf8_lossy(packet)))
        .map(|v| (v, HeadroomSource::Xmp))
}

/// Parses `HDRGainMap:HDRGainMapHeadroom` from XMP text.
pub fn parse_xmp_headroom(xmp: &str) -> Option<f64> {
    let re = XMP_HEADROOM.as_ref()?;
    re.captures_iter(xmp).find_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().trim().parse().ok())
    })
}

/// A decoded source asset.
pub trait DecodedAsset {
    /// Primary (base) image.
    fn primary(&self) -> IoResult<RawImage>;

    /// Auxiliary item ids grouped by type tag, in container order.
    fn aux_types(&self) -> Vec<(String, Vec<AuxId>)>;

    /// Decodes one auxiliary item.
    fn aux_image(&self, id: AuxId) -> IoResult<RawImage>;

    /// Decodes every depth image; each may fail on its own.
    fn depth_images(&self) -> Vec<IoResult<RawImage>>;

    /// Non-pixel metadata.
    fn metadata(&self) -> &AssetMetadata;

    /// Raw headroom value, if the asset carries one.
    fn headroom(&self) -> Option<f64> {
        discover_headroom(self.metadata()).map(|(v, _)| v)
    }
}

/// An asset assembled in memory.
///
/// # Example
///
/// ```rust
/// use hdrstack_io::{DecodedAsset, MemoryAsset, PixelMode, RawImage};
///
/// let base = RawImage::packed(PixelMode::Rgb, 1, 1, vec![255, 255, 255]).unwrap();
/// let gain = RawImage::packed(PixelMode::L, 1, 1, vec![128]).unwrap();
/// let asset = MemoryAsset::new(base)
///     .with_aux("urn:com:apple:photo:2020:aux:hdrgainmap", 50, gain)
///     .with_headroom(3.0);
/// assert_eq!(asset.headroom(), Some(3.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAsset {
    primary: Option<RawImage>,
    aux: Vec<(String, Vec<AuxId>)>,
    aux_images: BTreeMap<AuxId, RawImage>,
    depth: Vec<RawImage>,
    metadata: AssetMetadata,
}

impl MemoryAsset {
    /// Asset with a primary image and nothing else.
    pub fn new(primary: RawImage) -> Self {
        Self {
            primary: Some(primary),
            ..Default::default()
        }
    }

    /// Asset without a primary image.
    pub fn without_primary() -> Self {
        Self::default()
    }

    /// Adds an auxiliary image under a type tag.
    pub fn with_aux(mut self, tag: &str, id: AuxId, image: RawImage) -> Self {
        self.declare(tag, id);
        self.aux_images.insert(id, image);
        self
    }

    /// Lists an auxiliary id whose payload cannot be decoded.
    pub fn with_missing_aux(mut self, tag: &str, id: AuxId) -> Self {
        self.declare(tag, id);
        self
    }

    fn declare(&mut self, tag: &str, id: AuxId) {
        match self.aux.iter_mut().find(|(t, _)| t == tag) {
            Some((_, ids)) => ids.push(id),
            None => self.aux.push((tag.to_string(), vec![id])),
        }
    }

    /// Adds a depth image.
    pub fn with_depth(mut self, image: RawImage) -> Self {
        self.depth.push(image);
        self
    }

    /// Sets the explicit headroom info entry.
    pub fn with_headroom(mut self, headroom: f64) -> Self {
        self.metadata
            .info
            .insert(HEADROOM_KEY.to_string(), InfoValue::Float(headroom));
        self
    }

    /// Replaces all metadata.
    pub fn with_metadata(mut self, metadata: AssetMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mutable metadata access.
    pub fn metadata_mut(&mut self) -> &mut AssetMetadata {
        &mut self.metadata
    }
}

impl DecodedAsset for MemoryAsset {
    fn primary(&self) -> IoResult<RawImage> {
        self.primary
            .clone()
            .ok_or_else(|| IoError::MissingBase("asset has no primary image".into()))
    }

    fn aux_types(&self) -> Vec<(String, Vec<AuxId>)> {
        self.aux.clone()
    }

    fn aux_image(&self, id: AuxId) -> IoResult<RawImage> {
        self.aux_images
            .get(&id)
            .cloned()
            .ok_or_else(|| IoError::NotFound(format!("auxiliary image {}", id)))
    }

    fn depth_images(&self) -> Vec<IoResult<RawImage>> {
        self.depth.iter().cloned().map(Ok).collect()
    }

    fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }
}
