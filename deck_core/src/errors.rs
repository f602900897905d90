//! # Error Types
//!
//! Structured error types for deck_core. Every failure carries enough context
//! to tell a bad query apart from a bad configuration, so a design loop can
//! decide whether to skip a candidate or abort.
//!
//! ## Example
//!
//! ```rust
//! use deck_core::errors::{DeckError, DeckResult};
//!
//! fn check_cut(y: f64, height: f64) -> DeckResult<()> {
//!     if !(0.0..height).contains(&y) {
//!         return Err(DeckError::out_of_range("y", y, 0.0, height));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_cut(5.0, 10.0).is_ok());
//! assert_eq!(check_cut(10.0, 10.0).unwrap_err().error_code(), "OUT_OF_RANGE");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for deck_core operations
pub type DeckResult<T> = Result<T, DeckError>;

/// Structured error type for geometry, analysis and search operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum DeckError {
    /// A height/position query fell outside the half-open range `[min, max)`
    #[error("'{query}' = {value} is out of range [{min}, {max})")]
    OutOfRange {
        query: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The model itself is malformed (nested composite, span shorter than
    /// the train, mismatched axle data, unknown preset parameters, ...)
    #[error("Structurally invalid {subject}: {reason}")]
    StructuralValidity { subject: String, reason: String },

    /// The shape does not provide this operation
    #[error("'{operation}' is not supported for {shape} sections")]
    Unsupported { shape: String, operation: String },

    /// Every candidate of a search was rejected or failed to evaluate
    #[error("No feasible design: {evaluated} candidates tried, {rejected} rejected")]
    Infeasible { evaluated: usize, rejected: usize },

    /// A step size does not divide a length evenly
    #[error("Step {step} does not evenly divide length {length}")]
    Discretization { step: f64, length: f64 },

    /// An input value is invalid (out of range, wrong sign, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// An internal consistency check failed (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DeckError {
    /// Create an OutOfRange error
    pub fn out_of_range(query: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        DeckError::OutOfRange {
            query: query.into(),
            value,
            min,
            max,
        }
    }

    /// Create a StructuralValidity error
    pub fn structural(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        DeckError::StructuralValidity {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create an Unsupported error
    pub fn unsupported(shape: impl Into<String>, operation: impl Into<String>) -> Self {
        DeckError::Unsupported {
            shape: shape.into(),
            operation: operation.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DeckError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DeckError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        DeckError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        DeckError::Internal {
            message: message.into(),
        }
    }

    /// Whether a search may skip the offending candidate and keep going.
    ///
    /// Geometry and validity failures abort a single evaluation, never the
    /// whole search.
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            DeckError::OutOfRange { .. }
                | DeckError::StructuralValidity { .. }
                | DeckError::Unsupported { .. }
                | DeckError::InvalidInput { .. }
                | DeckError::Discretization { .. }
        )
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeckError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DeckError::OutOfRange { .. } => "OUT_OF_RANGE",
            DeckError::StructuralValidity { .. } => "STRUCTURAL_VALIDITY",
            DeckError::Unsupported { .. } => "UNSUPPORTED",
            DeckError::Infeasible { .. } => "INFEASIBLE",
            DeckError::Discretization { .. } => "DISCRETIZATION",
            DeckError::InvalidInput { .. } => "INVALID_INPUT",
            DeckError::FileError { .. } => "FILE_ERROR",
            DeckError::FileLocked { .. } => "FILE_LOCKED",
            DeckError::SerializationError { .. } => "SERIALIZATION_ERROR",
            DeckError::VersionMismatch { .. } => "VERSION_MISMATCH",
            DeckError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = DeckError::out_of_range("y", 12.0, 0.0, 10.0);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"OutOfRange\""));
        let roundtrip: DeckError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DeckError::structural("composite", "nested").error_code(),
            "STRUCTURAL_VALIDITY"
        );
        assert_eq!(
            DeckError::Infeasible {
                evaluated: 3,
                rejected: 3
            }
            .error_code(),
            "INFEASIBLE"
        );
    }

    #[test]
    fn test_candidate_local_errors() {
        assert!(DeckError::out_of_range("y", -1.0, 0.0, 1.0).is_candidate_local());
        assert!(DeckError::unsupported("circle", "sub_above").is_candidate_local());
        assert!(!DeckError::internal("shear did not close").is_candidate_local());
        assert!(!DeckError::Infeasible {
            evaluated: 0,
            rejected: 0
        }
        .is_candidate_local());
    }

    #[test]
    fn test_display_mentions_range() {
        let error = DeckError::out_of_range("y", 75.0, 0.0, 75.0);
        assert_eq!(error.to_string(), "'y' = 75 is out of range [0, 75)");
    }
}
