//! Error handling for millkit
//!
//! Provides the error types shared by every toolpath stage:
//! - Parameter errors (configuration validation)
//! - Toolpath errors (geometry, cancellation, sequencing)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Errors related to operation parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A required parameter is missing.
    #[error("Missing required parameter: {0}")]
    Missing(String),

    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ParameterError {
    /// Shorthand for an [`ParameterError::InvalidValue`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Fails with [`ParameterError::OutOfRange`] unless `min <= value <= max`.
    pub fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value.is_finite() && value >= min && value <= max {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                name: name.to_string(),
                value,
                min,
                max,
            })
        }
    }
}

/// Errors that abort a toolpath operation.
///
/// An operation that returns one of these leaves no output chunk list behind;
/// the caller decides whether to skip the operation or halt a batch.
#[derive(Error, Debug)]
pub enum ToolpathError {
    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Input geometry cannot be processed.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The operation was cancelled at a progress point.
    #[error("Operation cancelled")]
    Cancelled,

    /// No chunk could be sequenced without violating the cutting hierarchy.
    #[error("Sorter starvation: {remaining} chunks have unsorted children")]
    SorterStarvation {
        /// Number of chunks left when sequencing stalled.
        remaining: usize,
    },

    /// Image conversion failed.
    #[error("Image error: {0}")]
    Image(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolpathError {
    /// Shorthand for an [`ToolpathError::InvalidGeometry`].
    pub fn geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry(reason.into())
    }
}

/// Result type for toolpath operations.
pub type ToolpathResult<T> = Result<T, ToolpathError>;
