//! Error types for the timing registry.

use thiserror::Error;

/// Errors raised by timing registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A timestamp option or reference was negative or not finite
    #[error("{field} must be a finite non-negative number: {value}")]
    InvalidTimestamp {
        /// Which argument carried the value
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// A measure referenced a mark name that has not been recorded
    #[error("The mark '{0}' does not exist")]
    UnknownMark(String),

    /// The measure options combination is not allowed
    #[error("Invalid measure options: {0}")]
    InvalidMeasureOptions(&'static str),

    /// Failed to serialize registry state
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for timing registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
