//! Per-asset conversion pipeline.
//!
//! ```text
//! DecodedAsset -> extract_layers -> base chain ----------> reconstruct -> compose -> EXR
//!                                -> resample gain -> gain chain --^
//! ```
//!
//! Fatal errors (missing base, collisions, write failures) abort the
//! asset and leave no output. Anything wrong with one optional layer is
//! recorded in the [`AssetReport`] and the layer is left out.

use std::fmt;
use std::path::{Path, PathBuf};

use hdrstack_color::{ColorConfig, TransformChain};
use hdrstack_core::channel::{DEPTH_LAYER, GAINMAP_LAYER};
use hdrstack_core::{CompositeImage, Headroom, PixelBuffer};
use hdrstack_io::{asset_stem, extract_layers, open_asset, write_composite, DecodedAsset, ExrOptions, LayerSet, LayerWarning};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::composite::{compose, matte_label, CompositeInputs};
use crate::gainmap::reconstruct;
use crate::resize::{resample, Filter};
use crate::settings::Settings;
use crate::OpsResult;

/// Presence of one optional layer in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LayerState {
    /// Written to the output.
    Present,
    /// Not in the source asset.
    Absent,
    /// In the source but dropped.
    Warned(String),
}

/// Report line for one optional layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerStatus {
    /// Layer label (`gainmap`, `depth`, `matte semanticskinmatte#7`).
    pub label: String,
    /// What happened to it.
    #[serde(flatten)]
    pub state: LayerState,
}

impl LayerStatus {
    fn new(label: impl Into<String>, state: LayerState) -> Self {
        Self {
            label: label.into(),
            state,
        }
    }
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            LayerState::Present => write!(f, "{}: present", self.label),
            LayerState::Absent => write!(f, "{}: absent", self.label),
            LayerState::Warned(reason) => write!(f, "{}: dropped ({})", self.label, reason),
        }
    }
}

/// Summary of one converted asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    /// Source path, if the asset came from a file.
    pub input: Option<PathBuf>,
    /// Written EXR.
    pub output: PathBuf,
    /// Headroom used for reconstruction.
    pub headroom: f32,
    /// Output resolution.
    pub size: (u32, u32),
    /// Channels written, in composite order.
    pub channels: Vec<String>,
    /// Optional layers.
    pub layers: Vec<LayerStatus>,
}

impl AssetReport {
    /// Warnings recorded for this asset.
    pub fn warnings(&self) -> impl Iterator<Item = &LayerStatus> {
        self.layers
            .iter()
            .filter(|l| matches!(l.state, LayerState::Warned(_)))
    }
}

impl fmt::Display for AssetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => writeln!(f, "{} -> {}", input.display(), self.output.display())?,
            None => writeln!(f, "-> {}", self.output.display())?,
        }
        writeln!(
            f,
            "  {}x{}, headroom {}, {} channels",
            self.size.0,
            self.size.1,
            self.headroom,
            self.channels.len()
        )?;
        for layer in &self.layers {
            writeln!(f, "  {}", layer)?;
        }
        Ok(())
    }
}

/// Result of converting in memory.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The composite ready to write.
    pub image: CompositeImage,
    /// Headroom used.
    pub headroom: Headroom,
    /// Optional layer summary.
    pub layers: Vec<LayerStatus>,
}

/// Converts assets with resolved color chains.
#[derive(Debug, Clone)]
pub struct AssetPipeline {
    base_chain: TransformChain,
    gain_chain: TransformChain,
    filter: Filter,
    exr: ExrOptions,
    headroom: Option<Headroom>,
    output_suffix: String,
    output_extension: String,
}

impl AssetPipeline {
    /// Builds a pipeline, loading the color config named in `settings`.
    pub fn new(settings: &Settings) -> OpsResult<Self> {
        let config = match &settings.color_config {
            Some(path) => ColorConfig::from_file(path)?,
            None => ColorConfig::builtin(),
        };
        Self::with_config(settings, &config)
    }

    /// Builds a pipeline against an explicit color config.
    pub fn with_config(settings: &Settings, config: &ColorConfig) -> OpsResult<Self> {
        let headroom = settings.headroom.map(Headroom::new).transpose()?;
        Ok(Self {
            base_chain: TransformChain::resolve(config, &settings.base_chain)?,
            gain_chain: TransformChain::resolve(config, &settings.gainmap_chain)?,
            filter: settings.filter,
            exr: settings.exr,
            headroom,
            output_suffix: settings.output_suffix.clone(),
            output_extension: settings.output_extension.clone(),
        })
    }

    /// `<dir>/<stem><suffix>.<ext>`, where `dir` defaults to the input's
    /// directory.
    pub fn output_path(&self, input: &Path, output_dir: Option<&Path>) -> PathBuf {
        let name = format!("{}{}.{}", asset_stem(input), self.output_suffix, self.output_extension);
        match output_dir {
            Some(dir) => dir.join(name),
            None => input.with_file_name(name),
        }
    }

    /// Linearizes the gain map at base resolution.
    fn prepare_gain(&self, gain: &PixelBuffer, base: &PixelBuffer) -> OpsResult<PixelBuffer> {
        let fitted = resample(gain, base.width(), base.height(), self.filter)?;
        Ok(self.gain_chain.apply(&fitted)?)
    }

    /// Runs color, reconstruction and compositing on extracted layers.
    ///
    /// # Errors
    ///
    /// Base color failures and channel collisions. Optional-layer failures
    /// are reported in [`Conversion::layers`].
    pub fn convert_layers(&self, layers: &LayerSet) -> OpsResult<Conversion> {
        let mut warned: Vec<LayerWarning> = layers.warnings.clone();

        let sdr = self.base_chain.apply(&layers.base)?;

        let gain = match &layers.gainmap {
            Some(g) => match self.prepare_gain(g, &sdr) {
                Ok(lin) => Some(lin),
                Err(e) => {
                    warned.push(LayerWarning::emit(GAINMAP_LAYER, e));
                    None
                }
            },
            None => None,
        };

        let headroom = self.headroom.or(layers.headroom).unwrap_or(Headroom::NONE);
        let hdr = reconstruct(&sdr, gain.as_ref(), headroom)?;

        let composed = compose(
            &CompositeInputs {
                hdr: &hdr,
                sdr: &sdr,
                gainmap: gain.as_ref(),
                depth: layers.depth.as_ref(),
                mattes: &layers.mattes,
            },
            self.filter,
        )?;
        warned.extend(composed.warnings);

        let status = |label: String, present: bool| {
            let state = match warned.iter().find(|w| w.layer == label) {
                Some(w) => LayerState::Warned(w.reason.clone()),
                None if present => LayerState::Present,
                None => LayerState::Absent,
            };
            LayerStatus::new(label, state)
        };
        let mut statuses = vec![
            status(GAINMAP_LAYER.to_string(), layers.gainmap.is_some()),
            status(DEPTH_LAYER.to_string(), layers.depth.is_some()),
        ];
        statuses.extend(layers.mattes.iter().map(|m| status(matte_label(m), true)));
        for w in &warned {
            if !statuses.iter().any(|s| s.label == w.layer) {
                statuses.push(LayerStatus::new(w.layer.clone(), LayerState::Warned(w.reason.clone())));
            }
        }
        if !statuses.iter().any(|s| s.label.starts_with("matte")) {
            statuses.push(LayerStatus::new("mattes", LayerState::Absent));
        }

        Ok(Conversion {
            image: composed.image,
            headroom,
            layers: statuses,
        })
    }

    /// Converts one asset and writes it to `output`.
    ///
    /// The asset only counts as produced once the writer succeeds.
    pub fn process_asset(&self, asset: &dyn DecodedAsset, output: &Path) -> OpsResult<AssetReport> {
        let layers = extract_layers(asset)?;
        let conversion = self.convert_layers(&layers)?;
        write_composite(&conversion.image, output, &self.exr)?;

        let report = AssetReport {
            input: None,
            output: output.to_path_buf(),
            headroom: conversion.headroom.get(),
            size: conversion.image.dimensions(),
            channels: conversion
                .image
                .channel_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            layers: conversion.layers,
        };
        info!(
            output = %output.display(),
            channels = report.channels.len(),
            warnings = report.warnings().count(),
            "asset converted"
        );
        Ok(report)
    }

    /// Opens `input`, converts it and writes the EXR.
    ///
    /// `output` wins over `output_dir`; otherwise the name comes from
    /// [`AssetPipeline::output_path`].
    pub fn process_path(&self, input: &Path, output_dir: Option<&Path>, output: Option<&Path>) -> OpsResult<AssetReport> {
        let span = info_span!("asset", input = %input.display());
        let _enter = span.enter();

        let out = match output {
            Some(o) => o.to_path_buf(),
            None => self.output_path(input, output_dir),
        };
        debug!(output = %out.display(), "converting");
        let asset = open_asset(input)?;
        let mut report = self.process_asset(asset.as_ref(), &out)?;
        report.input = Some(input.to_path_buf());
        Ok(report)
    }
}
