//! Configuration errors and validation helpers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric field is outside its allowed range.
    #[error("'{field}' must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Provided value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A numeric field is below its minimum.
    #[error("'{field}' must be at least {min}, got {value}")]
    BelowMinimum {
        /// Field name.
        field: &'static str,
        /// Provided value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
    },

    /// Fields are individually valid but inconsistent with each other.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected schema.
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Validates a configuration value.
pub trait ConfigValidator {
    /// Returns an error describing the first invalid field.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Checks that `value` lies in the inclusive range `[min, max]`.
pub fn validate_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Checks that `value` is at least `min`.
pub fn validate_min(field: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(ConfigError::BelowMinimum { field, value, min })
    }
}
