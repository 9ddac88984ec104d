use thiserror::Error;

/// Misuse errors raised at the point of misconfiguration.
///
/// Numerical trouble during a solve is never an error: it surfaces as a
/// [`Status`](crate::state::Status) on the returned state instead.
#[derive(Clone, Debug, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{name}` = {value} is outside its domain [{min}, {max}]")]
    OutOfDomain {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("expected a starting point of dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Validate `value` against the closed interval `[min, max]`.
///
/// Out-of-domain values are rejected, never clamped.
pub(crate) fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && min <= value && value <= max {
        Ok(value)
    } else {
        Err(ConfigError::OutOfDomain {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Validate `value` against the half-open interval `(min, max]`.
pub(crate) fn check_half_open(
    name: &str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ConfigError> {
    if value.is_finite() && min < value && value <= max {
        Ok(value)
    } else {
        Err(ConfigError::OutOfDomain {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Validate `value` against the open interval `(min, max)`.
pub(crate) fn check_open(name: &str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && min < value && value < max {
        Ok(value)
    } else {
        Err(ConfigError::OutOfDomain {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}
