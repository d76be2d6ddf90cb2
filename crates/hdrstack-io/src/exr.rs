//! OpenEXR output.
//!
//! A [`CompositeImage`] is written as a single-part, single-layer EXR
//! whose channels carry the exact composite names (`R`, `sdr.G`,
//! `mattes.skin.Y`, ...). The container sorts channels alphabetically on
//! disk; [`read_composite`] restores the canonical order.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdrstack_io::exr::{write_composite, read_composite, ExrOptions};
//!
//! write_composite(&image, "IMG_0001_acesCG.exr", &ExrOptions::default())?;
//! let back = read_composite("IMG_0001_acesCG.exr")?;
//! ```

use std::path::Path;

use hdrstack_core::channel::{split_channel_name, DEPTH_LAYER, GAINMAP_LAYER, MATTES_LAYER, RGB, SDR_LAYER};
use hdrstack_core::{CompositeBuilder, CompositeImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{IoError, IoResult};

/// Sample precision on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// 32-bit float, lossless for composite samples.
    #[default]
    Float,
    /// 16-bit half float.
    Half,
}

/// Lossless EXR compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExrCompression {
    /// No compression.
    None,
    /// Run-length encoding.
    Rle,
    /// ZIP, 16 scanlines per block.
    #[default]
    Zip,
    /// PIZ wavelet.
    Piz,
}

impl ExrCompression {
    fn to_exr(self) -> exr::compression::Compression {
        use exr::compression::Compression;
        match self {
            ExrCompression::None => Compression::Uncompressed,
            ExrCompression::Rle => Compression::RLE,
            ExrCompression::Zip => Compression::ZIP16,
            ExrCompression::Piz => Compression::PIZ,
        }
    }
}

impl std::str::FromStr for ExrCompression {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "rle" => Ok(Self::Rle),
            "zip" => Ok(Self::Zip),
            "piz" => Ok(Self::Piz),
            other => Err(IoError::UnsupportedFormat(format!("EXR compression '{}'", other))),
        }
    }
}

/// EXR writer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExrOptions {
    /// Sample precision.
    pub precision: Precision,
    /// Compression method.
    pub compression: ExrCompression,
}

/// Writes a composite atomically.
///
/// Samples go to a temporary file in the destination directory which is
/// renamed over `path` only after the encoder succeeds. On failure the
/// temporary file is removed and `path` is untouched.
///
/// # Errors
///
/// [`IoError::Write`] for any encoder or filesystem failure.
pub fn write_composite(image: &CompositeImage, path: impl AsRef<Path>, options: &ExrOptions) -> IoResult<()> {
    use exr::prelude::*;
    use half::f16;
    use smallvec::SmallVec;

    let path = path.as_ref();
    let (width, height) = image.dimensions();
    if image.channels().is_empty() {
        return Err(IoError::write(path, "composite has no channels"));
    }

    let list: SmallVec<[AnyChannel<FlatSamples>; 4]> = image
        .channels()
        .iter()
        .map(|ch| {
            let samples = match options.precision {
                Precision::Float => FlatSamples::F32(ch.samples.clone()),
                Precision::Half => {
                    FlatSamples::F16(ch.samples.iter().map(|&v| f16::from_f32(v)).collect())
                }
            };
            AnyChannel::new(ch.name.as_str(), samples)
        })
        .collect();

    let encoding = Encoding {
        compression: options.compression.to_exr(),
        blocks: Blocks::ScanLines,
        line_order: LineOrder::Increasing,
    };
    let layer = Layer::new(
        (width as usize, height as usize),
        LayerAttributes::default(),
        encoding,
        AnyChannels::sort(list),
    );

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".hdrstack-")
        .suffix(".exr.tmp")
        .tempfile_in(dir)
        .map_err(|e| IoError::write(path, e))?;

    Image::from_layer(layer)
        .write()
        .to_file(tmp.path())
        .map_err(|e| IoError::write(path, e))?;
    tmp.persist(path).map_err(|e| IoError::write(path, e.error))?;

    debug!(
        path = %path.display(),
        channels = image.channels().len(),
        width,
        height,
        "EXR written"
    );
    Ok(())
}

/// Sort key placing channels in composite order.
///
/// Mattes keep their relative on-disk order; unknown channels go last.
fn channel_rank(name: &str) -> (u8, u8) {
    let rgb_pos = |c: &str| RGB.iter().position(|&r| r == c).map(|p| p as u8);
    match split_channel_name(name) {
        (None, c) => rgb_pos(c).map(|p| (0, p)).unwrap_or((6, 0)),
        (Some(SDR_LAYER), c) => rgb_pos(c).map(|p| (1, p)).unwrap_or((6, 0)),
        (Some(GAINMAP_LAYER), c) => rgb_pos(c).map(|p| (2, p)).unwrap_or((6, 0)),
        (Some(DEPTH_LAYER), _) => (3, 0),
        (Some(layer), _) if layer.starts_with(MATTES_LAYER) => (4, 0),
        _ => (6, 0),
    }
}

/// Reads an EXR written by [`write_composite`] back into a composite.
///
/// Every layer of the file must share one resolution. Named layers
/// prefix their channels with `<layer>.`.
pub fn read_composite(path: impl AsRef<Path>) -> IoResult<CompositeImage> {
    use exr::prelude::*;

    let path = path.as_ref();
    let image = read_all_flat_layers_from_file(path).map_err(|e| IoError::Decode(e.to_string()))?;

    let mut size: Option<(usize, usize)> = None;
    let mut channels: Vec<(String, Vec<f32>)> = Vec::new();
    for layer in image.layer_data.iter() {
        let dims = (layer.size.width(), layer.size.height());
        match size {
            None => size = Some(dims),
            Some(s) if s != dims => {
                return Err(IoError::Decode(format!(
                    "layers differ in size: {}x{} vs {}x{}",
                    s.0, s.1, dims.0, dims.1
                )))
            }
            _ => {}
        }
        let prefix = layer
            .attributes
            .layer_name
            .as_ref()
            .map(|n| format!("{}.", n))
            .unwrap_or_default();
        for channel in layer.channel_data.list.iter() {
            let name = format!("{}{}", prefix, channel.name);
            channels.push((name, channel.sample_data.values_as_f32().collect()));
        }
    }

    let (w, h) = size.ok_or_else(|| IoError::Decode("EXR has no layers".into()))?;
    channels.sort_by_key(|(name, _)| channel_rank(name));

    let mut builder = CompositeBuilder::new(w as u32, h as u32);
    for (name, samples) in channels {
        builder.push_channel(name, samples)?;
    }
    Ok(builder.build())
}
