//! Metadata snapshot.
//!
//! A pretty-printed JSON record of every non-pixel field of an asset, with
//! binary values base64-encoded so the file stays text-diffable. When the
//! snapshot is written by the extraction tool it also lists the TIFF files
//! it produced, which lets [`SidecarAsset`](crate::sidecar::SidecarAsset)
//! reopen the whole asset without the original container.
//!
//! ```json
//! {
//!   "info": { "HDRGainMapHeadroom": 2.9, "thumbnail": { "base64": "..." } },
//!   "aux_images": [ { "tag": "urn:...:hdrgainmap", "ids": [50] } ],
//!   "depth_images": [],
//!   "icc_profile": "AAAC...",
//!   "exif": null,
//!   "xmp": null,
//!   "primary": { "mode": "RGB", "size": [4032, 3024], "stride": 12096 },
//!   "headroom": 2.9
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::asset::{AssetMetadata, AuxId, DecodedAsset, InfoValue};
use crate::raw::{PixelMode, RawImage};
use crate::{IoError, IoResult};

/// Marker key wrapping base64 bytes inside `info`.
const BYTES_KEY: &str = "base64";

/// Layout of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Pixel mode.
    pub mode: PixelMode,
    /// `[width, height]`.
    pub size: [u32; 2],
    /// Row stride in bytes.
    pub stride: usize,
}

impl From<&RawImage> for ImageInfo {
    fn from(raw: &RawImage) -> Self {
        Self {
            mode: raw.mode(),
            size: [raw.width(), raw.height()],
            stride: raw.stride(),
        }
    }
}

/// Auxiliary ids under one type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxTypeEntry {
    /// Full type tag.
    pub tag: String,
    /// Item ids in container order.
    pub ids: Vec<AuxId>,
}

/// What an extracted file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// Primary image.
    Base,
    /// Auxiliary item.
    Aux,
    /// Depth image.
    Depth,
}

/// One file written by the extraction tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    /// Role of the image.
    pub role: FileRole,
    /// Type tag, for auxiliary items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Item id, for auxiliary items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AuxId>,
    /// Position, for depth images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// File name relative to the snapshot.
    pub file: String,
}

/// Serializable mirror of an asset's metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Info dictionary.
    #[serde(default)]
    pub info: Map<String, Value>,
    /// Auxiliary ids by type tag.
    #[serde(default)]
    pub aux_images: Vec<AuxTypeEntry>,
    /// Layout of each decodable depth image.
    #[serde(default)]
    pub depth_images: Vec<ImageInfo>,
    /// Base64 ICC profile.
    #[serde(default)]
    pub icc_profile: Option<String>,
    /// Base64 EXIF block.
    #[serde(default)]
    pub exif: Option<String>,
    /// Base64 XMP packet.
    #[serde(default)]
    pub xmp: Option<String>,
    /// Layout of the primary image.
    #[serde(default)]
    pub primary: Option<ImageInfo>,
    /// Headroom as found in the asset, unvalidated.
    #[serde(default)]
    pub headroom: Option<f64>,
    /// Files written alongside this snapshot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted: Vec<ExtractedFile>,
}

impl MetadataSnapshot {
    /// Captures the metadata of an asset.
    ///
    /// Decodes the primary and depth images only to record their layout.
    pub fn capture(asset: &dyn DecodedAsset) -> Self {
        let meta = asset.metadata();
        Self {
            info: meta
                .info
                .iter()
                .map(|(k, v)| (k.clone(), info_to_json(v)))
                .collect(),
            aux_images: asset
                .aux_types()
                .into_iter()
                .map(|(tag, ids)| AuxTypeEntry { tag, ids })
                .collect(),
            depth_images: asset
                .depth_images()
                .iter()
                .filter_map(|d| d.as_ref().ok().map(ImageInfo::from))
                .collect(),
            icc_profile: meta.icc_profile.as_deref().map(|b| STANDARD.encode(b)),
            exif: meta.exif.as_deref().map(|b| STANDARD.encode(b)),
            xmp: meta.xmp.as_deref().map(|b| STANDARD.encode(b)),
            primary: asset.primary().ok().as_ref().map(ImageInfo::from),
            headroom: asset.headroom(),
            extracted: Vec::new(),
        }
    }

    /// Rebuilds [`AssetMetadata`], decoding base64 fields.
    pub fn to_metadata(&self) -> IoResult<AssetMetadata> {
        let decode = |field: &str, v: &Option<String>| -> IoResult<Option<Vec<u8>>> {
            v.as_deref()
                .map(|s| {
                    STANDARD
                        .decode(s)
                        .map_err(|e| IoError::Decode(format!("{}: {}", field, e)))
                })
                .transpose()
        };
        Ok(AssetMetadata {
            info: self
                .info
                .iter()
                .filter_map(|(k, v)| json_to_info(v).map(|iv| (k.clone(), iv)))
                .collect(),
            icc_profile: decode("icc_profile", &self.icc_profile)?,
            exif: decode("exif", &self.exif)?,
            xmp: decode("xmp", &self.xmp)?,
        })
    }

    /// Writes pretty-printed JSON.
    pub fn write(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| IoError::write(path, e))?;
        debug!(path = %path.display(), "metadata snapshot written");
        Ok(())
    }

    /// Reads a snapshot file.
    pub fn read(path: impl AsRef<Path>) -> IoResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Converts an info value to JSON; bytes become `{"base64": "..."}`.
pub fn info_to_json(value: &InfoValue) -> Value {
    match value {
        InfoValue::Bool(b) => Value::Bool(*b),
        InfoValue::Int(i) => Value::from(*i),
        InfoValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        InfoValue::Text(s) => Value::String(s.clone()),
        InfoValue::Bytes(b) => {
            let mut m = Map::new();
            m.insert(BYTES_KEY.to_string(), Value::String(STANDARD.encode(b)));
            Value::Object(m)
        }
        InfoValue::List(items) => Value::Array(items.iter().map(info_to_json).collect()),
        InfoValue::Map(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), info_to_json(v))).collect()),
    }
}

/// Converts JSON back to an info value; `null` has no counterpart.
pub fn json_to_info(value: &Value) -> Option<InfoValue> {
    Some(match value {
        Value::Null => return None,
        Value::Bool(b) => InfoValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => InfoValue::Int(i),
            None => InfoValue::Float(n.as_f64()?),
        },
        Value::String(s) => InfoValue::Text(s.clone()),
        Value::Array(items) => InfoValue::List(items.iter().filter_map(json_to_info).collect()),
        Value::Object(map) => {
            if let (1, Some(Value::String(s))) = (map.len(), map.get(BYTES_KEY)) {
                if let Ok(bytes) = STANDARD.decode(s) {
                    return Some(InfoValue::Bytes(bytes));
                }
            }
            InfoValue::Map(
                map.iter()
                    .filter_map(|(k, v)| json_to_info(v).map(|iv| (k.clone(), iv)))
                    .collect::<BTreeMap<_, _>>(),
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAsset;

    fn asset() -> MemoryAsset {
        let base = RawImage::packed(PixelMode::Rgb, 2, 1, vec![0; 6]).unwrap();
        let gain = RawImage::packed(PixelMode::L, 1, 1, vec![9]).unwrap();
        let mut a = MemoryAsset::new(base)
            .with_aux("urn:com:apple:photo:2020:aux:hdrgainmap", 50, gain.clone())
            .with_depth(gain)
            .with_headroom(2.5);
        let meta = a.metadata_mut();
        meta.icc_profile = Some(vec![1, 2, 3]);
        meta.info.insert("thumb".into(), InfoValue::Bytes(vec![0xff, 0x00]));
        let mut nested = BTreeMap::new();
        nested.insert("count".into(), InfoValue::Int(2));
        meta.info.insert("nested".into(), InfoValue::Map(nested));
        a
    }

    #[test]
    fn test_capture_fields() {
        let snap = MetadataSnapshot::capture(&asset());
        assert_eq!(snap.primary.as_ref().unwrap().size, [2, 1]);
        assert_eq!(snap.primary.as_ref().unwrap().stride, 6);
        assert_eq!(snap.aux_images[0].ids, vec![50]);
        assert_eq!(snap.depth_images.len(), 1);
        assert_eq!(snap.icc_profile.as_deref(), Some("AQID"));
        assert_eq!(snap.exif, None);
        assert_eq!(snap.headroom, Some(2.5));
        assert_eq!(snap.info["thumb"]["base64"], "/wA=");
    }

    #[test]
    fn test_metadata_survives_json() {
        let a = asset();
        let snap = MetadataSnapshot::capture(&a);
        let text = serde_json::to_string_pretty(&snap).unwrap();
        let back: MetadataSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snap);
        assert_eq!(&back.to_metadata().unwrap(), a.metadata());
    }

    #[test]
    fn test_bad_base64() {
        let snap = MetadataSnapshot {
            exif: Some("***".into()),
            ..Default::default()
        };
        assert!(matches!(snap.to_metadata(), Err(IoError::Decode(_))));
    }
}
