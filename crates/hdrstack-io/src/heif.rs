//! HEIF/HEIC source assets.
//!
//! Requires the `heif` feature and system libheif >= 1.17.
//!
//! # Setup
//!
//! **Linux:**
//! ```bash
//! apt install libheif-dev   # Debian/Ubuntu
//! dnf install libheif-devel # Fedora
//! ```
//!
//! **macOS:**
//! ```bash
//! brew install libheif
//! ```
//!
//! Without the feature [`HeifAsset::open`] fails with
//! [`IoError::UnsupportedFeature`]; extracted sidecar snapshots still work.
//!
//! # Example
//!
//! ```ignore
//! use hdrstack_io::{extract_layers, heif::HeifAsset};
//!
//! let asset = HeifAsset::open("IMG_0001.HEIC")?;
//! let layers = extract_layers(&asset)?;
//! ```

use std::path::Path;

use crate::asset::{AssetMetadata, AuxId, DecodedAsset};
use crate::raw::RawImage;
use crate::{IoError, IoResult};

/// Info key holding the gain map's own XMP packet.
pub const GAINMAP_XMP_KEY: &str = "gainmap_xmp";

#[cfg(feature = "heif")]
mod imp {
    use super::*;
    use crate::asset::InfoValue;
    use crate::extract::is_gainmap_tag;
    use crate::raw::PixelMode;
    use libheif_rs::{
        AuxiliaryImagesFilter, ColorSpace, HeifContext, ImageHandle, ItemId, LibHeif, RgbChroma,
    };
    use tracing::debug;

    fn decode_err(what: &str, e: impl std::fmt::Display) -> IoError {
        IoError::Decode(format!("HEIF {}: {}", what, e))
    }

    fn aux_filter() -> AuxiliaryImagesFilter {
        AuxiliaryImagesFilter::OMIT_ALPHA | AuxiliaryImagesFilter::OMIT_DEPTH
    }

    /// Copies one plane into a [`RawImage`], keeping its stride.
    fn plane_to_raw(
        mode: PixelMode,
        width: u32,
        height: u32,
        stride: usize,
        data: &[u8],
    ) -> IoResult<RawImage> {
        let len = data.len().min(height as usize * stride);
        RawImage::new(mode, width, height, stride, data[..len].to_vec())
    }

    /// Rescales little-endian samples of `bits` significant bits to the full 16-bit range.
    fn widen_to_16(
        mode: PixelMode,
        width: u32,
        height: u32,
        stride: usize,
        data: &[u8],
        bits: u8,
    ) -> IoResult<RawImage> {
        let row_len = width as usize * mode.channels() * 2;
        let max = ((1u32 << bits.clamp(1, 16)) - 1) as f32;
        let mut samples = Vec::with_capacity(row_len / 2 * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            let row = row.get(..row_len).ok_or_else(|| IoError::Decode("HEIF plane row too short".into()))?;
            samples.extend(row.chunks_exact(2).map(|b| {
                let v = u16::from_le_bytes([b[0], b[1]]) as f32;
                (v / max * 65535.0).round().min(65535.0) as u16
            }));
        }
        RawImage::from_u16(mode, width, height, &samples)
    }

    fn decode_rgb(lib: &LibHeif, handle: &ImageHandle) -> IoResult<RawImage> {
        let deep = handle.luma_bits_per_pixel() > 8;
        let (chroma, mode) = if deep {
            (RgbChroma::HdrRgbLe, PixelMode::Rgb16)
        } else {
            (RgbChroma::Rgb, PixelMode::Rgb)
        };
        let image = lib
            .decode(handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| decode_err("primary", e))?;
        let plane = image
            .planes()
            .interleaved
            .ok_or_else(|| IoError::Decode("HEIF primary: no interleaved plane".into()))?;
        if deep {
            return widen_to_16(mode, handle.width(), handle.height(), plane.stride, plane.data, plane.bit_depth);
        }
        plane_to_raw(mode, handle.width(), handle.height(), plane.stride, plane.data)
    }

    fn decode_mono(lib: &LibHeif, handle: &ImageHandle) -> IoResult<RawImage> {
        let image = lib
            .decode(handle, ColorSpace::Monochrome, None)
            .map_err(|e| decode_err("monochrome", e))?;
        let plane = image
            .planes()
            .y
            .ok_or_else(|| IoError::Decode("HEIF monochrome: no luma plane".into()))?;
        if plane.storage_bits_per_pixel > 8 {
            return widen_to_16(PixelMode::L16, handle.width(), handle.height(), plane.stride, plane.data, plane.bit_depth);
        }
        plane_to_raw(PixelMode::L, handle.width(), handle.height(), plane.stride, plane.data)
    }

    fn xmp_blocks(handle: &ImageHandle) -> Vec<Vec<u8>> {
        handle
            .metadata_block_ids(b"mime")
            .into_iter()
            .filter(|id| {
                handle
                    .metadata_content_type(*id)
                    .is_some_and(|t| t.contains("rdf+xml"))
            })
            .filter_map(|id| handle.metadata(id).ok())
            .collect()
    }

    /// A HEIF container opened through libheif.
    pub struct HeifAsset {
        lib: LibHeif,
        ctx: HeifContext<'static>,
        metadata: AssetMetadata,
    }

    impl std::fmt::Debug for HeifAsset {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HeifAsset").field("metadata", &self.metadata).finish()
        }
    }

    impl HeifAsset {
        /// Opens a HEIF/HEIC file.
        pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
            let path = path.as_ref();
            let name = path
                .to_str()
                .ok_or_else(|| IoError::Decode(format!("invalid path: {:?}", path)))?;
            let ctx = HeifContext::read_from_file(name).map_err(|e| decode_err("read", e))?;
            let mut asset = Self {
                lib: LibHeif::new(),
                ctx,
                metadata: AssetMetadata::default(),
            };
            asset.metadata = asset.collect_metadata();
            debug!(path = %path.display(), "HEIF opened");
            Ok(asset)
        }

        fn handle(&self) -> IoResult<ImageHandle> {
            self.ctx
                .primary_image_handle()
                .map_err(|e| IoError::MissingBase(e.to_string()))
        }

        fn aux_handles(&self) -> Vec<ImageHandle> {
            self.handle()
                .map(|h| h.auxiliary_images(aux_filter()))
                .unwrap_or_default()
        }

        fn collect_metadata(&self) -> AssetMetadata {
            let mut meta = AssetMetadata::default();
            let Ok(handle) = self.handle() else {
                return meta;
            };
            meta.icc_profile = handle.color_profile_raw().map(|p| p.data);
            meta.exif = handle
                .metadata_block_ids(b"Exif")
                .into_iter()
                .find_map(|id| handle.metadata(id).ok());
            meta.xmp = xmp_blocks(&handle).into_iter().next();
            meta.info.insert(
                "bit_depth".into(),
                InfoValue::Int(i64::from(handle.luma_bits_per_pixel())),
            );
            meta.info
                .insert("has_alpha".into(), InfoValue::Bool(handle.has_alpha_channel()));

            for aux in handle.auxiliary_images(aux_filter()) {
                let is_gain = aux.auxiliary_type().map(|t| is_gainmap_tag(&t)).unwrap_or(false);
                if is_gain {
                    if let Some(packet) = xmp_blocks(&aux).into_iter().next() {
                        meta.info.insert(GAINMAP_XMP_KEY.into(), InfoValue::Bytes(packet));
                    }
                }
            }
            meta
        }
    }

    impl DecodedAsset for HeifAsset {
        fn primary(&self) -> IoResult<RawImage> {
            let handle = self.handle()?;
            decode_rgb(&self.lib, &handle)
        }

        fn aux_types(&self) -> Vec<(String, Vec<AuxId>)> {
            let mut out: Vec<(String, Vec<AuxId>)> = Vec::new();
            for aux in self.aux_handles() {
                let Ok(tag) = aux.auxiliary_type() else {
                    continue;
                };
                let id: AuxId = aux.item_id();
                match out.iter_mut().find(|(t, _)| *t == tag) {
                    Some((_, ids)) => ids.push(id),
                    None => out.push((tag, vec![id])),
                }
            }
            out
        }

        fn aux_image(&self, id: AuxId) -> IoResult<RawImage> {
            let handle = self
                .aux_handles()
                .into_iter()
                .find(|h| h.item_id() == id)
                .ok_or_else(|| IoError::NotFound(format!("auxiliary image {}", id)))?;
            decode_mono(&self.lib, &handle)
        }

        fn depth_images(&self) -> Vec<IoResult<RawImage>> {
            let Ok(handle) = self.handle() else {
                return Vec::new();
            };
            let count = handle.number_of_depth_images().max(0) as usize;
            let mut ids: Vec<ItemId> = vec![0; count];
            let found = handle.depth_image_ids(&mut ids);
            ids.truncate(found);
            ids.into_iter()
                .map(|id| {
                    handle
                        .depth_image_handle(id)
                        .map_err(|e| decode_err("depth", e))
                        .and_then(|h| decode_mono(&self.lib, &h))
                })
                .collect()
        }

        fn metadata(&self) -> &AssetMetadata {
            &self.metadata
        }
    }
}

#[cfg(feature = "heif")]
pub use imp::HeifAsset;

/// Placeholder when the `heif` feature is disabled.
#[cfg(not(feature = "heif"))]
#[derive(Debug)]
pub struct HeifAsset {
    metadata: AssetMetadata,
}

#[cfg(not(feature = "heif"))]
impl HeifAsset {
    /// Always fails: HEIF support requires the `heif` feature.
    pub fn open(_path: impl AsRef<Path>) -> IoResult<Self> {
        Err(IoError::UnsupportedFeature(
            "HEIF support requires the 'heif' feature".into(),
        ))
    }
}

#[cfg(not(feature = "heif"))]
impl DecodedAsset for HeifAsset {
    fn primary(&self) -> IoResult<RawImage> {
        Err(IoError::MissingBase("HEIF support not compiled in".into()))
    }

    fn aux_types(&self) -> Vec<(String, Vec<AuxId>)> {
        Vec::new()
    }

    fn aux_image(&self, id: AuxId) -> IoResult<RawImage> {
        Err(IoError::NotFound(format!("auxiliary image {}", id)))
    }

    fn depth_images(&self) -> Vec<IoResult<RawImage>> {
        Vec::new()
    }

    fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }
}

/// `true` for file names the HEIF reader should handle.
pub fn is_heif_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "heic" | "heif" | "hif"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heif_extensions() {
        assert!(is_heif_path(Path::new("IMG_0001.HEIC")));
        assert!(is_heif_path(Path::new("a/b.heif")));
        assert!(!is_heif_path(Path::new("IMG_0001_metadata.json")));
        assert!(!is_heif_path(Path::new("noext")));
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_open_without_feature() {
        assert!(matches!(
            HeifAsset::open("missing.heic"),
            Err(IoError::UnsupportedFeature(_))
        ));
    }
}
