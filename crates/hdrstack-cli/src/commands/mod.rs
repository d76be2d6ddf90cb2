//! CLI command implementations

pub mod batch;
pub mod convert;
pub mod extract;
pub mod layers;

use crate::SettingsArgs;
use anyhow::{Context, Result};
use hdrstack_io::{ExrCompression, Precision};
use hdrstack_ops::{Filter, Settings};
use std::path::Path;
use tracing::debug;

/// Loads `--config` (or defaults) and applies the flag overrides.
pub fn load_settings(args: &SettingsArgs, jobs: Option<usize>) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path).with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(path) = &args.color_config {
        settings.color_config = Some(path.clone());
    }
    if let Some(name) = &args.filter {
        settings.filter = name.parse::<Filter>()?;
    }
    if args.half {
        settings.exr.precision = Precision::Half;
    }
    if let Some(name) = &args.compression {
        settings.exr.compression = name.parse::<ExrCompression>()?;
    }
    if let Some(h) = args.headroom {
        settings.headroom = Some(h);
    }
    if let Some(j) = jobs.filter(|&j| j > 0) {
        settings.jobs = Some(j);
    }

    debug!(
        filter = %settings.filter,
        precision = ?settings.exr.precision,
        compression = ?settings.exr.compression,
        "settings resolved"
    );
    Ok(settings)
}

/// Creates `dir` if needed.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))
}
