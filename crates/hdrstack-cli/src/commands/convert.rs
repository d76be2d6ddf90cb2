//! Single-asset conversion.

use crate::ConvertArgs;
use anyhow::{Context, Result};
use hdrstack_ops::AssetPipeline;
use tracing::{info, trace};

/// Runs the convert command and prints the asset report.
pub fn run(args: ConvertArgs, jobs: Option<usize>) -> Result<()> {
    trace!(input = %args.input.display(), "convert::run");

    let settings = super::load_settings(&args.settings, jobs)?;
    let pipeline = AssetPipeline::new(&settings).context("Invalid color settings")?;

    if let Some(dir) = &args.output_dir {
        super::ensure_dir(dir)?;
    }
    if let Some(parent) = args.output.as_deref().and_then(|o| o.parent()).filter(|p| !p.as_os_str().is_empty()) {
        super::ensure_dir(parent)?;
    }

    let report = pipeline
        .process_path(&args.input, args.output_dir.as_deref(), args.output.as_deref())
        .with_context(|| format!("Failed to convert: {}", args.input.display()))?;

    info!(output = %report.output.display(), "done");
    print!("{}", report);
    Ok(())
}
