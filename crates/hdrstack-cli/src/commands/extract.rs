//! Layer dump to TIFF plus metadata snapshot.

use crate::ExtractArgs;
use anyhow::{Context, Result};
use hdrstack_io::{asset_stem, extract_to_dir, open_asset};
use std::path::Path;
use tracing::{info, trace};

pub fn run(args: ExtractArgs) -> Result<()> {
    trace!(input = %args.input.display(), "extract::run");

    let asset = open_asset(&args.input).with_context(|| format!("Failed to open: {}", args.input.display()))?;
    let dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };
    super::ensure_dir(&dir)?;

    let stem = asset_stem(&args.input);
    let outcome = extract_to_dir(asset.as_ref(), &stem, &dir)
        .with_context(|| format!("Failed to extract: {}", args.input.display()))?;

    info!(
        files = outcome.snapshot.extracted.len(),
        warnings = outcome.warnings.len(),
        "extraction complete"
    );
    for file in &outcome.snapshot.extracted {
        println!("{}", dir.join(&file.file).display());
    }
    println!("{}", outcome.snapshot_path.display());
    for w in &outcome.warnings {
        eprintln!("warning: {}", w);
    }
    Ok(())
}
