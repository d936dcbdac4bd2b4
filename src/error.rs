//! Error types for the detection pipeline.
//!
//! Errors only ever arise at the input boundary (malformed samples) and at
//! construction time (invalid configuration). Detector internals are total
//! and never fail.

use thiserror::Error;

use crate::types::SensorKind;

/// A specialized `Result` type for pipeline operations.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Top-level error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VigilError {
    /// A sample was rejected before reaching any filter.
    #[error("rejected sample: {0}")]
    Sample(#[from] SampleError),

    /// The pipeline configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Reasons a sample is refused at the ingestor.
///
/// Feeding any of these into the exponential filters would poison every
/// subsequent estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("{kind:?} sample at {timestamp_ms}ms has a non-finite axis value")]
    NonFinite { kind: SensorKind, timestamp_ms: u64 },

    #[error("{kind:?} sample at {timestamp_ms}ms exceeds ±{limit} m/s² (got {value})")]
    OutOfRange {
        kind: SensorKind,
        timestamp_ms: u64,
        value: f32,
        limit: f32,
    },
}

/// Configuration validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{lower} must be below {upper}")]
    Inverted {
        lower: &'static str,
        upper: &'static str,
    },

    #[cfg(feature = "serde")]
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Checks `min <= value <= max`, NaN included as a failure.
    pub(crate) fn check_range(
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), ConfigError> {
        if value >= min && value <= max {
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

    /// Checks `lower < upper`.
    pub(crate) fn check_order(
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    ) -> std::result::Result<(), ConfigError> {
        if lower_value < upper_value {
            Ok(())
        } else {
            Err(ConfigError::Inverted { lower, upper })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(ConfigError::check_range("alpha", 0.5, 0.0, 1.0).is_ok());
        assert!(ConfigError::check_range("alpha", 1.0, 0.0, 1.0).is_ok());
        assert!(matches!(
            ConfigError::check_range("alpha", 1.5, 0.0, 1.0),
            Err(ConfigError::OutOfRange { field: "alpha", .. })
        ));
        assert!(ConfigError::check_range("alpha", f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_check_order() {
        assert!(ConfigError::check_order("a", 1.0, "b", 2.0).is_ok());
        assert_eq!(
            ConfigError::check_order("a", 2.0, "b", 2.0),
            Err(ConfigError::Inverted { lower: "a", upper: "b" })
        );
    }

    #[test]
    fn test_error_conversion_and_display() {
        let err: VigilError = SampleError::NonFinite {
            kind: SensorKind::Accelerometer,
            timestamp_ms: 40,
        }
        .into();
        assert!(matches!(err, VigilError::Sample(_)));
        assert!(err.to_string().contains("non-finite"));

        let err: VigilError = ConfigError::Inverted {
            lower: "free_fall_threshold",
            upper: "impact_threshold",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: free_fall_threshold must be below impact_threshold"
        );
    }
}
