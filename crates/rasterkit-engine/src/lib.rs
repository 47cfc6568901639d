//! # RasterKit Engine
//!
//! Converts a decoded RGBA pixel source into laser G-code.
//!
//! The pipeline runs leaves first:
//! - [`tiles`]: grid of bounded tiles and the power lookup over them
//! - [`power`]: raw sample to device power mapping
//! - [`trim`]: leading and trailing white pixel removal
//! - [`scan`]: row and diagonal scan orders
//! - [`emitter`]: command formatting with redundancy suppression
//! - [`parser`]: the engine state machine
//! - [`rasterizer`]: the orchestrator running the engine on its own thread
//!
//! ```no_run
//! use rasterkit_engine::{Rasterizer, RgbaBuffer};
//! use rasterkit_settings::RasterSettings;
//!
//! # fn main() -> rasterkit_core::Result<()> {
//! let image = RgbaBuffer::filled(32, 32, [0, 0, 0, 255]);
//! let output = Rasterizer::new(RasterSettings::default())?
//!     .rasterize(&image)?
//!     .blocking_collect()?;
//! println!("{}", output.gcode);
//! # Ok(())
//! # }
//! ```

pub mod emitter;
pub mod message;
pub mod parser;
pub mod power;
pub mod rasterizer;
pub mod scan;
pub mod source;
pub mod tiles;
pub mod trim;

pub use emitter::{CommandEmitter, CommandState, EmitterConfig, Letter, Motion};
pub use message::{
    CellData, ChunkKind, EngineInit, EngineMessage, EngineReply, GcodeData, OutputEvent,
};
pub use parser::{header, ParserState, RasterParser};
pub use power::PowerMapper;
pub use rasterizer::{
    CancelToken, GcodeChunk, PreparedImage, RasterOutput, RasterRun, Rasterizer, RunId,
    ENGINE_VERSION,
};
pub use scan::{DiagonalScan, RowScan, ScanLine, ScanLines, ScanOrder};
pub use source::{PixelSource, RgbaBuffer};
pub use tiles::{PowerSource, Tile, TileGrid, TileStore};
pub use trim::trim_line;
