//! Error types for fields and waves.

use thiserror::Error;

/// Errors that can occur while building or sampling fields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Currents only flow into or out of the plane.
    #[error("Invalid current direction {0:?}: only IN (0, 0, -1) and OUT (0, 0, 1) are supported")]
    InvalidCurrentDirection([f64; 3]),

    /// A source has unusable parameters.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Grid ranges or step are unusable.
    #[error("Invalid sampling grid: {0}")]
    InvalidGrid(String),

    /// No charge at this index.
    #[error("Charge index out of range: {0}")]
    UnknownCharge(usize),

    /// Wave parameters are out of range.
    #[error("Invalid wave: {0}")]
    InvalidWave(String),

    /// Lens parameters are out of range.
    #[error("Invalid lens: {0}")]
    InvalidLens(String),

    /// A ray needs a direction and a positive length.
    #[error("Invalid ray: {0}")]
    InvalidRay(String),

    /// Time steps must be finite and non-negative.
    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f64),
}

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;
