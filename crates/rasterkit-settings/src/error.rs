//! Error types for the settings crate.

use rasterkit_core::{ConfigurationError, Error};
use std::io;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The settings failed validation.
    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Io(e) => Error::Io(e),
            SettingsError::Config(e) => Error::Configuration(e),
            SettingsError::Json(e) => ConfigurationError::Parse(e.to_string()).into(),
            SettingsError::Toml(e) => ConfigurationError::Parse(e.to_string()).into(),
            SettingsError::TomlSerialize(e) => Error::other(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_passes_through() {
        let err: SettingsError = ConfigurationError::invalid("ppi", "must be greater than 0").into();
        assert_eq!(err.to_string(), "Invalid value for 'ppi': must be greater than 0");

        let err: Error = err.into();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_json_error_becomes_configuration_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = SettingsError::from(json_err).into();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_toml_serialize_error_becomes_other() {
        // A bare integer cannot be a TOML document.
        let err: SettingsError = toml::to_string(&1u32).unwrap_err().into();
        let err: Error = err.into();
        assert!(matches!(err, Error::Other(_)));
    }
}
