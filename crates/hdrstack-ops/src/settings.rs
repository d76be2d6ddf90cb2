//! Pipeline settings.
//!
//! Every field has a default, so an empty YAML document is valid:
//!
//! ```yaml
//! base_chain:
//!   - color_convert: { from: "sRGB - Texture", to: "Linear Rec.709 (sRGB)" }
//!   - color_convert: { from: "Linear P3-D65", to: "ACES - ACEScg" }
//! gainmap_chain:
//!   - named_transform: { name: "Rec.709 - Curve" }
//! filter: bilinear
//! exr:
//!   precision: float
//!   compression: zip
//! output_suffix: _acesCG
//! output_extension: exr
//! color_config: null
//! jobs: null
//! ```

use std::path::{Path, PathBuf};

use hdrstack_color::TransformRequest;
use hdrstack_io::ExrOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resize::Filter;
use crate::{OpsError, OpsResult};

/// Default output name suffix.
pub const DEFAULT_SUFFIX: &str = "_acesCG";
/// Default output extension.
pub const DEFAULT_EXTENSION: &str = "exr";

/// Settings for converting assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Transforms applied to the base image.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub base_chain: Vec<TransformRequest>,
    /// Transforms applied to the gain map after resampling.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub gainmap_chain: Vec<TransformRequest>,
    /// Filter used to bring auxiliary layers to base resolution.
    pub filter: Filter,
    /// EXR writer options.
    pub exr: ExrOptions,
    /// Appended to the input stem.
    pub output_suffix: String,
    /// Output extension without the dot.
    pub output_extension: String,
    /// Color config YAML; the built-in catalogue when unset.
    pub color_config: Option<PathBuf>,
    /// Headroom used instead of the asset's own value.
    pub headroom: Option<f32>,
    /// Batch workers; available parallelism when unset.
    pub jobs: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_chain: TransformRequest::base_chain(),
            gainmap_chain: TransformRequest::gainmap_chain(),
            filter: Filter::default(),
            exr: ExrOptions::default(),
            output_suffix: DEFAULT_SUFFIX.to_string(),
            output_extension: DEFAULT_EXTENSION.to_string(),
            color_config: None,
            headroom: None,
            jobs: None,
        }
    }
}

impl Settings {
    /// Parses YAML settings.
    pub fn from_yaml_str(yaml: &str) -> OpsResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| OpsError::Settings(e.to_string()))
    }

    /// Reads a YAML settings file.
    pub fn load(path: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OpsError::Settings(format!("{}: {}", path.display(), e)))?;
        let settings = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> OpsResult<String> {
        serde_yaml::to_string(self).map_err(|e| OpsError::Settings(e.to_string()))
    }

    /// Worker count for batch runs, at least 1.
    pub fn worker_count(&self) -> usize {
        self.jobs
            .filter(|&j| j > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}
