//! # hdrstack-ops
//!
//! Gain-map HDR reconstruction and multi-layer compositing.
//!
//! # Modules
//!
//! - [`resize`] - bringing auxiliary layers to base resolution
//! - [`gainmap`] - `HDR = B * (G * (h - 1) + 1)`
//! - [`composite`] - fixed channel layout with collision checks
//! - [`pipeline`] - asset in, EXR and [`AssetReport`] out
//! - [`settings`] - YAML settings with defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use hdrstack_ops::{AssetPipeline, Settings};
//!
//! let pipeline = AssetPipeline::new(&Settings::default())?;
//! let report = pipeline.process_path("IMG_0001.HEIC".as_ref(), None, None)?;
//! print!("{}", report);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod composite;
pub mod gainmap;
pub mod pipeline;
pub mod resize;
pub mod settings;

pub use composite::{compose, Composed, CompositeInputs};
pub use error::{OpsError, OpsResult};
pub use gainmap::reconstruct;
pub use pipeline::{AssetPipeline, AssetReport, Conversion, LayerState, LayerStatus};
pub use resize::{resample, Filter};
pub use settings::Settings;
