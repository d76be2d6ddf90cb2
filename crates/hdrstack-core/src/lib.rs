//! # hdrstack-core
//!
//! Core data model for gain-map HDR reconstruction.
//!
//! - [`PixelBuffer`] - owned interleaved `f32` image passed between stages
//! - [`Headroom`] - validated peak multiplier of a gain map
//! - [`ChannelSpec`] and [`channel::sanitize_matte_name`] - output channel naming
//! - [`CompositeImage`] / [`CompositeBuilder`] - named planar channels ready to write
//!
//! ## Crate Structure
//!
//! ```text
//! hdrstack-core (this crate)
//!    ^
//!    |
//!    +-- hdrstack-color (transfer curves, gamut matrices)
//!    +-- hdrstack-io (asset decoding, EXR output)
//!    +-- hdrstack-ops (resample, reconstruct, composite, pipeline)
//!    +-- hdrstack-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod channel;
pub mod composite;
pub mod error;
pub mod headroom;

pub use buffer::PixelBuffer;
pub use channel::{sanitize_matte_name, ChannelSpec};
pub use composite::{Channel, CompositeBuilder, CompositeImage};
pub use error::{Error, Result};
pub use headroom::Headroom;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::channel::{ChannelSpec, DEPTH_LAYER, GAINMAP_LAYER, MATTES_LAYER, SDR_LAYER};
    pub use crate::{CompositeBuilder, CompositeImage, Error, Headroom, PixelBuffer, Result};
}
