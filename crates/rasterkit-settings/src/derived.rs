//! Values derived once per run from [`RasterSettings`].

use crate::config::{BeamRange, RasterSettings};
use rasterkit_core::ImageSize;
use serde::{Deserialize, Serialize};

/// Millimeters covered by one source pixel, rounded to 10 decimals.
///
/// Historically named "pixels per millimeter"; 254 ppi gives `0.1`.
pub fn pixels_per_millimeter(ppi: u32) -> f64 {
    round_to(2540.0 / (ppi as f64 * 100.0), 10)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Per-run derived values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSettings {
    /// See [`pixels_per_millimeter`]
    pub ppm: f64,
    /// Source-to-output scale factor (`ppm / beamSize`)
    pub scale_ratio: f64,
    /// Half-pixel offset that centers the beam on each pixel
    pub beam_offset: f64,
    /// Effective power range used by the power mapper
    pub beam_range: BeamRange,
}

impl DerivedSettings {
    /// Derive run values from validated settings.
    ///
    /// Both ends of the effective beam range are percentages of the
    /// configured `beamRange.max`; the configured `beamRange.min` is not used.
    pub fn from_settings(settings: &RasterSettings) -> Self {
        let ppm = pixels_per_millimeter(settings.ppi);
        let original_max = settings.beam_range.max;

        Self {
            ppm,
            scale_ratio: ppm / settings.beam_size,
            beam_offset: settings.beam_size * 1000.0 / 2000.0,
            beam_range: BeamRange {
                min: original_max / 100.0 * settings.beam_power.min,
                max: original_max / 100.0 * settings.beam_power.max,
            },
        }
    }

    /// Output pixel dimensions for a source image of `width` x `height` pixels.
    pub fn image_size(&self, width: u32, height: u32) -> ImageSize {
        ImageSize {
            width: scale(width, self.scale_ratio),
            height: scale(height, self.scale_ratio),
        }
    }
}

fn scale(length: u32, ratio: f64) -> u32 {
    let scaled = (length as f64 * ratio).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}
