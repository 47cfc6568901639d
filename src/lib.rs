//! # RasterKit
//!
//! Raster image to laser G-code conversion.
//!
//! ## Architecture
//!
//! RasterKit is organized as a workspace with multiple crates:
//!
//! 1. **rasterkit-core** - Pixel and grid types, error taxonomy, constants
//! 2. **rasterkit-settings** - Run settings, validation, persistence, derived values
//! 3. **rasterkit-engine** - Tiling, power mapping, trimming, scan orders, emission, orchestration
//! 4. **rasterkit** - This facade
//!
//! ## Example
//!
//! ```no_run
//! use rasterkit::{Rasterizer, RasterSettings, RgbaBuffer};
//!
//! # fn main() -> rasterkit::Result<()> {
//! rasterkit::init_logging().ok();
//!
//! let image = RgbaBuffer::filled(100, 100, [0, 0, 0, 255]);
//! let output = Rasterizer::new(RasterSettings::default())?
//!     .rasterize(&image)?
//!     .blocking_collect()?;
//! println!("{}", output.gcode);
//! # Ok(())
//! # }
//! ```

pub use rasterkit_core::{
    ConfigurationError, Error, GridSize, ImageSize, PixelCoord, ProtocolError, RangeError,
    Result, TileCoord, DEFAULT_BUFFER_SIZE,
};

pub use rasterkit_settings::{
    BeamPower, BeamRange, DerivedSettings, Offsets, Precision, RasterSettings, SettingsError,
};

pub use rasterkit_engine::{
    CancelToken, EngineMessage, EngineReply, GcodeChunk, OutputEvent, PixelSource,
    PreparedImage, RasterOutput, RasterParser, RasterRun, Rasterizer, RgbaBuffer, RunId,
    ScanOrder,
};

pub use rasterkit_engine as engine;
pub use rasterkit_settings as settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Human-readable output on stderr, filtered by `RUST_LOG` (default INFO).
/// Does nothing if a global subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Like [`init_logging`], with one JSON object per event.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging().unwrap();
        init_logging().unwrap();
        init_json_logging().unwrap();
    }

    #[test]
    fn test_header_carries_version() {
        let output = Rasterizer::new(RasterSettings::default())
            .unwrap()
            .rasterize(&RgbaBuffer::filled(1, 1, [0, 0, 0, 255]))
            .unwrap()
            .blocking_collect()
            .unwrap();
        assert!(output
            .header
            .starts_with(&format!("; Generated by rasterkit - {}", VERSION)));
    }

    #[tokio::test]
    async fn test_facade_async_run() {
        let mut run = Rasterizer::new(RasterSettings::default())
            .unwrap()
            .rasterize(&RgbaBuffer::filled(2, 1, [0, 0, 0, 255]))
            .unwrap();

        let mut last = None;
        while let Some(event) = run.next_event().await {
            last = Some(event.unwrap());
        }
        assert_eq!(last, Some(OutputEvent::Done));
    }
}
