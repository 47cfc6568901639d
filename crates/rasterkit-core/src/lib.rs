//! # RasterKit Core
//!
//! Core types, constants, and the error taxonomy shared by the RasterKit
//! crates. Provides the pixel and grid geometry used by the tile store and
//! scan generators, plus the unified [`Error`] type returned by public APIs.

pub mod constants;
pub mod error;
pub mod types;

pub use constants::{DEFAULT_BUFFER_SIZE, MAX_PRECISION};

pub use error::{ConfigurationError, Error, ProtocolError, RangeError, Result};

pub use types::{tile_extent, BoxedIterator, GridSize, ImageSize, Line, PixelCoord, TileCoord};
