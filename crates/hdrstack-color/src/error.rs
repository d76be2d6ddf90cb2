//! Error types for color operations.

use thiserror::Error;

/// Color operation error.
///
/// Covers name resolution against a [`ColorConfig`](crate::ColorConfig),
/// config loading and buffer shape problems met while applying a chain.
#[derive(Debug, Error)]
pub enum ColorError {
    /// A colorspace name is not defined in the config.
    #[error("unknown colorspace: '{0}'")]
    UnknownColorspace(String),

    /// A named transform is not defined in the config.
    #[error("unknown named transform: '{0}'")]
    UnknownNamedTransform(String),

    /// Both ends resolved but there is no way to convert between them.
    #[error("unsupported conversion: {from} -> {to}")]
    UnsupportedConversion {
        /// Source colorspace.
        from: String,
        /// Target colorspace.
        to: String,
    },

    /// Config file could not be parsed or is inconsistent.
    #[error("invalid color config: {0}")]
    InvalidConfig(String),

    /// I/O error while reading a config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error.
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Buffer did not have the channel count a transform needs.
    #[error(transparent)]
    Core(#[from] hdrstack_core::Error),
}

/// Result type for color operations.
pub type ColorResult<T> = Result<T, ColorError>;
