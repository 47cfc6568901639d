//! Error handling for RasterKit
//!
//! Provides the error types for every layer of a rasterization run:
//! - Configuration errors (invalid or missing settings)
//! - Range errors (pixel lookups outside the image)
//! - Protocol errors (engine message ordering and tile delivery)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Raised while validating run settings, always before any output is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A setting has an unusable value.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A setting is outside its valid range.
    #[error("Value out of range for '{key}': {value} (valid: {min}..{max})")]
    OutOfRange {
        /// The setting name.
        key: String,
        /// The rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The configuration document could not be parsed.
    #[error("Invalid configuration document: {0}")]
    Parse(String),
}

impl ConfigurationError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Pixel lookup outside the scaled image.
///
/// Only a scan generator or trimmer bug can trigger this, so it aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Out of range: x = {x} (width {width})")]
    X { x: u32, width: u32 },

    #[error("Out of range: y = {y} (height {height})")]
    Y { y: u32, height: u32 },
}

/// Engine message protocol violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A message arrived in a state that does not accept it.
    #[error("Unexpected '{message}' message while {state}")]
    UnexpectedMessage {
        /// The engine state name.
        state: String,
        /// The message type.
        message: String,
    },

    /// The announced grid does not match the image size.
    #[error("Grid {x}x{y} does not cover image {width}x{height} with buffer size {buffer_size}")]
    GridMismatch {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        buffer_size: u32,
    },

    /// A tile addressed a cell outside the grid.
    #[error("Tile ({x}, {y}) is outside the {grid_x}x{grid_y} grid")]
    TileOutOfGrid {
        x: u32,
        y: u32,
        grid_x: u32,
        grid_y: u32,
    },

    /// A tile buffer has the wrong byte length.
    #[error("Tile ({x}, {y}) has {actual} bytes, expected {expected}")]
    TileSizeMismatch {
        x: u32,
        y: u32,
        expected: usize,
        actual: usize,
    },

    /// Parsing was requested before every tile arrived.
    #[error("Tile ({x}, {y}) was never received")]
    MissingTile { x: u32, y: u32 },

    /// The other side of the message channel went away.
    #[error("Engine channel closed")]
    ChannelClosed,

    /// The engine stopped without signalling completion.
    #[error("Engine stopped: {0}")]
    EngineStopped(String),
}

/// Main error type for RasterKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Range error
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The run was cancelled between lines
    #[error("Rasterization cancelled")]
    Cancelled,

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_range_error(&self) -> bool {
        matches!(self, Error::Range(_))
    }

    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
