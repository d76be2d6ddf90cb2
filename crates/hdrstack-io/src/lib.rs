//! # hdrstack-io
//!
//! Source asset access and output for gain-map HDR reconstruction.
//!
//! - [`DecodedAsset`] - primary, auxiliary and depth images plus metadata
//! - [`extract_layers`] - resolves base, gain map, depth, mattes and headroom
//! - [`exr`] - multi-layer EXR writer and reader
//! - [`sidecar`] - TIFF + JSON extraction and reopening
//!
//! # Sources
//!
//! | Source | Type | Notes |
//! |--------|------|-------|
//! | HEIF/HEIC | [`heif::HeifAsset`] | needs the `heif` feature |
//! | `*_metadata.json` | [`SidecarAsset`] | written by [`extract_to_dir`] |
//! | in memory | [`MemoryAsset`] | fixtures |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hdrstack_io::{open_asset, extract_layers};
//!
//! let asset = open_asset("IMG_0001.HEIC")?;
//! let layers = extract_layers(asset.as_ref())?;
//! for w in &layers.warnings {
//!     eprintln!("{}", w);
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `heif` - HEIF/HEIC decoding through libheif

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod asset;
pub mod error;
pub mod exr;
pub mod extract;
pub mod heif;
pub mod raw;
pub mod sidecar;
pub mod snapshot;
pub mod tiff;

use std::path::Path;

pub use asset::{AssetMetadata, AuxId, DecodedAsset, InfoValue, MemoryAsset};
pub use error::{IoError, IoResult};
pub use exr::{read_composite, write_composite, ExrCompression, ExrOptions, Precision};
pub use extract::{extract_layers, LayerSet, LayerWarning, Matte};
pub use raw::{PixelMode, RawImage};
pub use sidecar::{extract_to_dir, ExtractOutcome, SidecarAsset};
pub use snapshot::MetadataSnapshot;

/// Opens a source asset, choosing the reader from the file name.
///
/// `*.json` opens an extraction snapshot; `*.heic`/`*.heif`/`*.hif` goes
/// through libheif.
///
/// # Errors
///
/// [`IoError::UnsupportedFormat`] for other extensions, and whatever the
/// selected reader reports.
pub fn open_asset(path: impl AsRef<Path>) -> IoResult<Box<dyn DecodedAsset>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::MissingBase(format!("{} does not exist", path.display())));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => Ok(Box::new(SidecarAsset::open(path)?)),
        _ if heif::is_heif_path(path) => Ok(Box::new(heif::HeifAsset::open(path)?)),
        _ => Err(IoError::UnsupportedFormat(format!(
            "no asset reader for {}",
            path.display()
        ))),
    }
}

/// Asset stem used in output names.
///
/// Snapshot files drop their `_metadata` suffix, so `IMG_0001_metadata.json`
/// and `IMG_0001.HEIC` both give `IMG_0001`.
pub fn asset_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let snapshot_stem = sidecar::SNAPSHOT_SUFFIX.trim_end_matches(".json");
    match stem.strip_suffix(snapshot_stem) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_stem() {
        assert_eq!(asset_stem(Path::new("a/IMG_0001.HEIC")), "IMG_0001");
        assert_eq!(asset_stem(Path::new("IMG_0001_metadata.json")), "IMG_0001");
        assert_eq!(asset_stem(Path::new("_metadata.json")), "_metadata");
    }

    #[test]
    fn test_open_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(open_asset(&path), Err(IoError::UnsupportedFormat(_))));
        assert!(matches!(
            open_asset(dir.path().join("gone.heic")),
            Err(IoError::MissingBase(_))
        ));
    }
}
