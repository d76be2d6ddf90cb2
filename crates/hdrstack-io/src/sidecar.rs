//! Extraction to sidecar files and reading them back.
//!
//! [`extract_to_dir`] writes every image of an asset as TIFF plus a
//! `<stem>_metadata.json` snapshot listing those files:
//!
//! ```text
//! IMG_0001_base.tiff
//! IMG_0001_hdrgainmap_50.tiff
//! IMG_0001_semanticskinmatte_51.tiff
//! IMG_0001_depth_0.tiff
//! IMG_0001_metadata.json
//! ```
//!
//! [`SidecarAsset`] opens such a snapshot as a [`DecodedAsset`], so the
//! conversion pipeline can run without the original container.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::asset::{AssetMetadata, AuxId, DecodedAsset};
use crate::extract::{tag_name, LayerWarning};
use crate::raw::RawImage;
use crate::snapshot::{ExtractedFile, FileRole, MetadataSnapshot};
use crate::tiff::{read_raw, write_raw};
use crate::{IoError, IoResult};

/// Suffix of snapshot files written by [`extract_to_dir`].
pub const SNAPSHOT_SUFFIX: &str = "_metadata.json";

/// Outcome of [`extract_to_dir`].
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    /// Path of the written snapshot.
    pub snapshot_path: PathBuf,
    /// The snapshot, including the `extracted` file list.
    pub snapshot: MetadataSnapshot,
    /// Images that could not be written.
    pub warnings: Vec<LayerWarning>,
}

/// Writes every image of `asset` and its metadata snapshot into `dir`.
///
/// # Errors
///
/// [`IoError::MissingBase`] if the primary image cannot be decoded, and
/// write errors for the base image or the snapshot. Auxiliary and depth
/// images that fail are reported as warnings.
pub fn extract_to_dir(asset: &dyn DecodedAsset, stem: &str, dir: &Path) -> IoResult<ExtractOutcome> {
    std::fs::create_dir_all(dir).map_err(|e| IoError::write(dir, e))?;
    let mut snapshot = MetadataSnapshot::capture(asset);
    let mut warnings = Vec::new();

    let base = asset.primary()?;
    let base_file = format!("{}_base.tiff", stem);
    write_raw(dir.join(&base_file), &base)?;
    snapshot.extracted.push(ExtractedFile {
        role: FileRole::Base,
        tag: None,
        id: None,
        index: None,
        file: base_file,
    });

    for (tag, ids) in asset.aux_types() {
        let name = tag_name(&tag);
        for id in ids {
            let file = format!("{}_{}_{}.tiff", stem, name, id);
            match asset
                .aux_image(id)
                .and_then(|raw| write_raw(dir.join(&file), &raw))
            {
                Ok(()) => {
                    debug!(file = %file, "auxiliary image written");
                    snapshot.extracted.push(ExtractedFile {
                        role: FileRole::Aux,
                        tag: Some(tag.clone()),
                        id: Some(id),
                        index: None,
                        file,
                    });
                }
                Err(e) => warnings.push(LayerWarning::emit(format!("{} {}", name, id), e)),
            }
        }
    }

    for (i, depth) in asset.depth_images().into_iter().enumerate() {
        let file = format!("{}_depth_{}.tiff", stem, i);
        match depth.and_then(|raw| write_raw(dir.join(&file), &raw)) {
            Ok(()) => snapshot.extracted.push(ExtractedFile {
                role: FileRole::Depth,
                tag: None,
                id: None,
                index: Some(i),
                file,
            }),
            Err(e) => warnings.push(LayerWarning::emit(format!("depth {}", i), e)),
        }
    }

    let snapshot_path = dir.join(format!("{}{}", stem, SNAPSHOT_SUFFIX));
    snapshot.write(&snapshot_path)?;
    info!(
        path = %snapshot_path.display(),
        files = snapshot.extracted.len(),
        warnings = warnings.len(),
        "extraction complete"
    );

    Ok(ExtractOutcome {
        snapshot_path,
        snapshot,
        warnings,
    })
}

/// An asset backed by an extraction snapshot and its TIFF files.
#[derive(Debug, Clone)]
pub struct SidecarAsset {
    dir: PathBuf,
    snapshot: MetadataSnapshot,
    metadata: AssetMetadata,
}

impl SidecarAsset {
    /// Opens a `<stem>_metadata.json` snapshot.
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        let snapshot = MetadataSnapshot::read(path)?;
        let metadata = snapshot.to_metadata()?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            dir,
            snapshot,
            metadata,
        })
    }

    /// The underlying snapshot.
    pub fn snapshot(&self) -> &MetadataSnapshot {
        &self.snapshot
    }

    fn read_file(&self, entry: &ExtractedFile) -> IoResult<RawImage> {
        read_raw(self.dir.join(&entry.file))
    }
}

impl DecodedAsset for SidecarAsset {
    fn primary(&self) -> IoResult<RawImage> {
        let entry = self
            .snapshot
            .extracted
            .iter()
            .find(|f| f.role == FileRole::Base)
            .ok_or_else(|| IoError::MissingBase("snapshot lists no base file".into()))?;
        self.read_file(entry)
            .map_err(|e| IoError::MissingBase(format!("{}: {}", entry.file, e)))
    }

    fn aux_types(&self) -> Vec<(String, Vec<AuxId>)> {
        self.snapshot
            .aux_images
            .iter()
            .map(|e| (e.tag.clone(), e.ids.clone()))
            .collect()
    }

    fn aux_image(&self, id: AuxId) -> IoResult<RawImage> {
        let entry = self
            .snapshot
            .extracted
            .iter()
            .find(|f| f.role == FileRole::Aux && f.id == Some(id))
            .ok_or_else(|| IoError::NotFound(format!("auxiliary image {} has no sidecar file", id)))?;
        self.read_file(entry)
    }

    fn depth_images(&self) -> Vec<IoResult<RawImage>> {
        let mut entries: Vec<&ExtractedFile> = self
            .snapshot
            .extracted
            .iter()
            .filter(|f| f.role == FileRole::Depth)
            .collect();
        entries.sort_by_key(|f| f.index.unwrap_or(usize::MAX));
        entries.into_iter().map(|e| self.read_file(e)).collect()
    }

    fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }

    fn headroom(&self) -> Option<f64> {
        crate::asset::discover_headroom(&self.metadata)
            .map(|(v, _)| v)
            .or(self.snapshot.headroom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAsset;
    use crate::raw::PixelMode;

    #[test]
    fn test_extract_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let base = RawImage::packed(PixelMode::Rgb, 2, 2, (0..12).collect()).unwrap();
        let gain = RawImage::from_u16(PixelMode::L16, 1, 1, &[40000]).unwrap();
        let matte = RawImage::packed(PixelMode::L, 2, 2, vec![1, 2, 3, 4]).unwrap();
        let asset = MemoryAsset::new(base.clone())
            .with_aux("urn:com:apple:photo:2020:aux:hdrgainmap", 50, gain.clone())
            .with_aux("urn:com:apple:photo:2020:aux:semanticskinmatte", 51, matte.clone())
            .with_missing_aux("urn:com:apple:photo:2020:aux:semanticskinmatte", 52)
            .with_depth(matte.clone())
            .with_headroom(2.0);

        let out = extract_to_dir(&asset, "IMG", dir.path()).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(dir.path().join("IMG_base.tiff").exists());
        assert!(dir.path().join("IMG_hdrgainmap_50.tiff").exists());
        assert!(dir.path().join("IMG_semanticskinmatte_51.tiff").exists());
        assert!(dir.path().join("IMG_depth_0.tiff").exists());
        assert_eq!(out.snapshot_path, dir.path().join("IMG_metadata.json"));

        let side = SidecarAsset::open(&out.snapshot_path).unwrap();
        assert_eq!(side.primary().unwrap(), base);
        assert_eq!(side.aux_image(50).unwrap(), gain);
        assert_eq!(side.aux_image(51).unwrap(), matte);
        assert!(side.aux_image(52).is_err());
        assert_eq!(side.aux_types(), asset.aux_types());
        assert_eq!(side.depth_images().len(), 1);
        assert_eq!(side.headroom(), Some(2.0));
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_metadata.json");
        MetadataSnapshot::default().write(&path).unwrap();
        let side = SidecarAsset::open(&path).unwrap();
        assert!(matches!(side.primary(), Err(IoError::MissingBase(_))));
    }
}
