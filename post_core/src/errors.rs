//! # Error Types
//!
//! Structured error types for post_core. Every variant carries enough
//! context to locate the offending entity (element, joint, folder, unit
//! string) so a batch run can report exactly which record was skipped.
//!
//! ## Example
//!
//! ```rust
//! use post_core::errors::{PostError, PostResult};
//!
//! fn validate_radius(radius: f64) -> PostResult<()> {
//!     if radius <= 0.0 {
//!         return Err(PostError::invalid_geometry("radius", radius, "Radius must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_radius(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for post_core operations
pub type PostResult<T> = Result<T, PostError>;

/// Structured error type for post-processing operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum PostError {
    /// Section geometry is missing, non-positive or not finite
    #[error("Invalid geometry for '{field}': {value} - {reason}")]
    InvalidGeometry {
        field: String,
        value: String,
        reason: String,
    },

    /// An expected result channel or load component is absent
    #[error("Missing field: {field} ({context})")]
    MissingField { field: String, context: String },

    /// A named folder, selection or coordinate system was not found or is not unique
    #[error("Ambiguous lookup: {kind} '{name}' matched {matches} entries")]
    AmbiguousLookup {
        kind: String,
        name: String,
        matches: usize,
    },

    /// Opaque failure surfaced from the model or results interface
    #[error("Host API failure: {operation} - {reason}")]
    HostApiFailure { operation: String, reason: String },

    /// An input value is invalid (bad unit string, empty list, etc.)
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

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl PostError {
    /// Create an InvalidGeometry error
    pub fn invalid_geometry(field: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        PostError::InvalidGeometry {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        PostError::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an AmbiguousLookup error
    pub fn ambiguous_lookup(kind: impl Into<String>, name: impl Into<String>, matches: usize) -> Self {
        PostError::AmbiguousLookup {
            kind: kind.into(),
            name: name.into(),
            matches,
        }
    }

    /// Create a HostApiFailure error
    pub fn host_api(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        PostError::HostApiFailure {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PostError::InvalidInput {
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
        PostError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a batch pass may skip the offending record and continue.
    ///
    /// Geometry and missing-channel failures are local to one record; all
    /// other failures abort the pass.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            PostError::InvalidGeometry { .. } | PostError::MissingField { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            PostError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            PostError::MissingField { .. } => "MISSING_FIELD",
            PostError::AmbiguousLookup { .. } => "AMBIGUOUS_LOOKUP",
            PostError::HostApiFailure { .. } => "HOST_API_FAILURE",
            PostError::InvalidInput { .. } => "INVALID_INPUT",
            PostError::FileError { .. } => "FILE_ERROR",
            PostError::SerializationError { .. } => "SERIALIZATION_ERROR",
            PostError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for PostError {
    fn from(e: serde_json::Error) -> Self {
        PostError::SerializationError {
            reason: e.to_string(),
        }
    }
}
