//! Configuration and derived values for RasterKit runs
//!
//! Provides the run configuration struct with documented defaults,
//! validation, JSON/TOML persistence, and the values derived once per run:
//! - Pixels-per-millimeter and the image scale ratio
//! - The half-pixel beam offset
//! - The effective beam power range

pub mod config;
pub mod derived;
pub mod error;

pub use config::{BeamPower, BeamRange, Offsets, Precision, RasterSettings};
pub use derived::{pixels_per_millimeter, DerivedSettings};
pub use error::{SettingsError, SettingsResult};
