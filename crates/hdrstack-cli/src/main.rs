//! hdrstack - gain-map HDR to multi-layer EXR
//!
//! Rebuilds the HDR rendition of a gain-map photo and writes it, together
//! with the SDR base, gain map, depth and mattes, into one ACEScg EXR.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "hdrstack")]
#[command(author, version, about = "Gain-map HDR to multi-layer ACEScg EXR")]
#[command(long_about = "
Rebuilds the HDR image stored as SDR base + gain map + headroom and writes
it with every auxiliary layer into a single multi-layer EXR.

Examples:
  hdrstack convert IMG_0001.HEIC                  # IMG_0001_acesCG.exr next to the input
  hdrstack convert IMG_0001.HEIC --output-dir out
  hdrstack convert IMG_0001.HEIC --half -c piz --filter nearest
  hdrstack extract IMG_0001.HEIC -d layers        # TIFFs + IMG_0001_metadata.json
  hdrstack convert layers/IMG_0001_metadata.json  # convert from an extraction
  hdrstack batch 'shoot/*.HEIC' -o out -j 4
  hdrstack layers out/IMG_0001_acesCG.exr --json
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write the log to this file
    #[arg(long, global = true, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Assets converted at once by batch runs (0 = auto)
    #[arg(short = 'j', long, global = true)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one asset to a multi-layer EXR
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Dump every image of an asset to TIFF plus a metadata snapshot
    #[command(visible_alias = "x")]
    Extract(ExtractArgs),

    /// Convert many assets in parallel
    Batch(BatchArgs),

    /// List layers and channels of written EXR files
    #[command(visible_alias = "l")]
    Layers(LayersArgs),
}

/// Settings overrides shared by `convert` and `batch`.
#[derive(Args, Default)]
struct SettingsArgs {
    /// Settings YAML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Color config YAML (built-in catalogue when omitted)
    #[arg(long, value_name = "FILE")]
    color_config: Option<PathBuf>,

    /// Resample filter: nearest, bilinear
    #[arg(short, long)]
    filter: Option<String>,

    /// Write 16-bit half floats instead of 32-bit floats
    #[arg(long)]
    half: bool,

    /// EXR compression: none, rle, zip, piz
    #[arg(short = 'c', long)]
    compression: Option<String>,

    /// Headroom used instead of the asset's own value
    #[arg(long)]
    headroom: Option<f32>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input asset (.heic/.heif/.hif, or an extraction snapshot .json)
    input: PathBuf,

    /// Directory for the output (default: next to the input)
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Explicit output path
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args)]
struct ExtractArgs {
    /// Input asset
    input: PathBuf,

    /// Directory for the extracted files (default: next to the input)
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct BatchArgs {
    /// Input glob patterns
    #[arg(required = true)]
    input: Vec<String>,

    /// Output directory
    #[arg(short = 'o', long)]
    output_dir: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args)]
struct LayersArgs {
    /// EXR file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

/// Installs the stderr subscriber and, with `--log`, a non-blocking file writer.
///
/// The returned guard flushes the file writer on drop.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log path has no file name: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_deref())?;

    match cli.command {
        Commands::Convert(args) => commands::convert::run(args, cli.jobs),
        Commands::Extract(args) => commands::extract::run(args),
        Commands::Batch(args) => commands::batch::run(args, cli.jobs),
        Commands::Layers(args) => commands::layers::run(args, cli.verbose),
    }
}
