//! Run configuration for the rasterizer
//!
//! Every field has a documented default so partial JSON or TOML documents
//! merge onto the defaults. Settings are immutable for the duration of a run.

use crate::error::{SettingsError, SettingsResult};
use rasterkit_core::{ConfigurationError, DEFAULT_BUFFER_SIZE, MAX_PRECISION};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Device power range in raw firmware units (the `S` value).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamRange {
    pub min: f64,
    pub max: f64,
}

impl Default for BeamRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Beam power calibration as a percentage of the beam range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamPower {
    pub min: f64,
    pub max: f64,
}

impl Default for BeamPower {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
        }
    }
}

/// Number of decimals for each emitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    #[serde(rename = "X")]
    pub x: u8,
    #[serde(rename = "Y")]
    pub y: u8,
    #[serde(rename = "S")]
    pub s: u8,
}

impl Default for Precision {
    fn default() -> Self {
        Self { x: 2, y: 2, s: 4 }
    }
}

/// Global coordinate offsets in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offsets {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

/// Rasterization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RasterSettings {
    /// Source resolution in pixels per inch (25.4 ppi == one pixel per mm)
    pub ppi: u32,
    /// Resample with a linear filter while tiling
    pub smoothing: bool,
    /// Beam size in millimeters (one output pixel)
    pub beam_size: f64,
    /// Feed rate in mm/min
    pub feed_rate: f64,
    /// Strip leading and trailing white pixels from each line
    pub trim_line: bool,
    /// Burn inner white pixels at zero power (`G1 S0`) instead of travelling (`G0`)
    pub burn_white: bool,
    /// Print every token on every command
    pub verbose_g: bool,
    /// Walk the image along anti-diagonals instead of rows
    pub diagonal: bool,
    /// Maximum tile edge length in pixels
    pub buffer_size: u32,
    /// Device power range (firmware units)
    pub beam_range: BeamRange,
    /// Beam power as percentage of the beam range
    pub beam_power: BeamPower,
    /// Decimals per emitted value
    pub precision: Precision,
    /// Coordinate offsets added to every emitted position
    pub offsets: Offsets,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            ppi: 254,
            smoothing: false,
            beam_size: 0.1,
            feed_rate: 1500.0,
            trim_line: true,
            burn_white: true,
            verbose_g: true,
            diagonal: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            beam_range: BeamRange::default(),
            beam_power: BeamPower::default(),
            precision: Precision::default(),
            offsets: Offsets::default(),
        }
    }
}

impl RasterSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and return the settings
    pub fn validated(self) -> Result<Self, ConfigurationError> {
        self.validate()?;
        Ok(self)
    }

    /// Check every setting against its valid range
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ppi == 0 {
            return Err(ConfigurationError::invalid("ppi", "must be greater than 0"));
        }

        positive("beamSize", self.beam_size)?;
        positive("feedRate", self.feed_rate)?;

        if self.buffer_size == 0 {
            return Err(ConfigurationError::invalid(
                "bufferSize",
                "must be greater than 0",
            ));
        }

        finite("beamRange.min", self.beam_range.min)?;
        finite("beamRange.max", self.beam_range.max)?;
        if self.beam_range.min < 0.0 {
            return Err(ConfigurationError::OutOfRange {
                key: "beamRange.min".to_string(),
                value: self.beam_range.min,
                min: 0.0,
                max: self.beam_range.max,
            });
        }
        if self.beam_range.min > self.beam_range.max {
            return Err(ConfigurationError::invalid(
                "beamRange",
                format!(
                    "min ({}) is greater than max ({})",
                    self.beam_range.min, self.beam_range.max
                ),
            ));
        }

        percentage("beamPower.min", self.beam_power.min)?;
        percentage("beamPower.max", self.beam_power.max)?;
        if self.beam_power.min > self.beam_power.max {
            return Err(ConfigurationError::invalid(
                "beamPower",
                format!(
                    "min ({}) is greater than max ({})",
                    self.beam_power.min, self.beam_power.max
                ),
            ));
        }

        for (key, value) in [
            ("precision.X", self.precision.x),
            ("precision.Y", self.precision.y),
            ("precision.S", self.precision.s),
        ] {
            if value > MAX_PRECISION {
                return Err(ConfigurationError::OutOfRange {
                    key: key.to_string(),
                    value: value as f64,
                    min: 0.0,
                    max: MAX_PRECISION as f64,
                });
            }
        }

        finite("offsets.X", self.offsets.x)?;
        finite("offsets.Y", self.offsets.y)?;

        Ok(())
    }

    /// Names of the enabled boolean options, as printed in the G-code header
    pub fn enabled_options(&self) -> Vec<&'static str> {
        [
            ("smoothing", self.smoothing),
            ("trimLine", self.trim_line),
            ("burnWhite", self.burn_white),
            ("verboseG", self.verbose_g),
            ("diagonal", self.diagonal),
        ]
        .into_iter()
        .filter_map(|(name, enabled)| enabled.then_some(name))
        .collect()
    }

    /// Parse and validate settings from a JSON document
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let settings: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        settings.validate()?;
        tracing::debug!("Loaded raster settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = ConfigFormat::from_path(path)?;

        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, SettingsError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigurationError::UnsupportedFormat(format!(
                "{} (config file must be .json or .toml)",
                path.display()
            ))
            .into()),
        }
    }
}

fn finite(key: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(key, "must be a finite number"))
    }
}

fn positive(key: &str, value: f64) -> Result<(), ConfigurationError> {
    finite(key, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(
            key,
            format!("must be greater than 0, got {}", value),
        ))
    }
}

fn percentage(key: &str, value: f64) -> Result<(), ConfigurationError> {
    finite(key, value)?;
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            key: key.to_string(),
            value,
            min: 0.0,
            max: 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RasterSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.ppi, 254);
        assert_eq!(settings.buffer_size, 2048);
        assert_eq!(settings.precision, Precision { x: 2, y: 2, s: 4 });
    }

    #[test]
    fn test_partial_json_merges_onto_defaults() {
        let settings =
            RasterSettings::from_json_str(r#"{"ppi": 300, "beamRange": {"min": 0, "max": 255}}"#)
                .unwrap();
        assert_eq!(settings.ppi, 300);
        assert_eq!(settings.beam_range.max, 255.0);
        assert_eq!(settings.feed_rate, 1500.0);
        assert!(settings.trim_line);
    }

    #[test]
    fn test_precision_uses_axis_letters() {
        let settings =
            RasterSettings::from_json_str(r#"{"precision": {"X": 3, "Y": 1, "S": 0}}"#).unwrap();
        assert_eq!(settings.precision, Precision { x: 3, y: 1, s: 0 });
    }

    #[test]
    fn test_rejects_zero_ppi() {
        let settings = RasterSettings {
            ppi: 0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { ref key, .. } if key == "ppi"));
    }

    #[test]
    fn test_rejects_bad_beam_size() {
        for beam_size in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let settings = RasterSettings {
                beam_size,
                ..Default::default()
            };
            assert!(settings.validate().is_err(), "beam size {beam_size}");
        }
    }

    #[test]
    fn test_rejects_power_outside_percentage() {
        let settings = RasterSettings {
            beam_power: BeamPower {
                min: 0.0,
                max: 120.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let settings = RasterSettings {
            beam_range: BeamRange { min: 5.0, max: 1.0 },
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = RasterSettings {
            beam_power: BeamPower {
                min: 60.0,
                max: 40.0,
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_excessive_precision() {
        let settings = RasterSettings {
            precision: Precision { x: 2, y: 11, s: 4 },
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::OutOfRange { ref key, .. }) if key == "precision.Y"
        ));
    }

    #[test]
    fn test_enabled_options_order() {
        let settings = RasterSettings {
            smoothing: true,
            diagonal: true,
            ..Default::default()
        };
        assert_eq!(
            settings.enabled_options(),
            vec!["smoothing", "trimLine", "burnWhite", "verboseG", "diagonal"]
        );

        let settings = RasterSettings {
            trim_line: false,
            burn_white: false,
            verbose_g: false,
            ..Default::default()
        };
        assert!(settings.enabled_options().is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = RasterSettings::load_from_file(Path::new("settings.yaml")).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigurationError::UnsupportedFormat(_))
        ));
    }
}
