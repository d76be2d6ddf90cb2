//! # hdrstack-color
//!
//! Color transform chains for gain-map HDR reconstruction.
//!
//! - [`transfer`] - sRGB, Rec.709 and gamma curves
//! - [`primaries`] - gamut chromaticities and Bradford-adapted RGB matrices
//! - [`ColorConfig`] - named colorspaces and named transforms (built-in or YAML)
//! - [`TransformChain`] - resolved sequence of [`ColorTransform`] steps applied to a
//!   [`PixelBuffer`](hdrstack_core::PixelBuffer)
//!
//! ## Quick Start
//!
//! ```rust
//! use hdrstack_color::{ColorConfig, TransformChain, TransformRequest};
//!
//! let config = ColorConfig::builtin();
//! let gain = TransformChain::resolve(&config, &TransformRequest::gainmap_chain()).unwrap();
//! assert_eq!(gain.steps().len(), 1);
//! ```

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod error;
pub mod primaries;
pub mod transfer;

pub use chain::{ColorTransform, TransformChain, TransformRequest};
pub use config::{ColorConfig, ColorSpaceDef, Direction, NamedTransformDef};
pub use error::{ColorError, ColorResult};
pub use primaries::Gamut;
pub use transfer::Curve;
