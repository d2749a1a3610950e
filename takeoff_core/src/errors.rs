//! # Error Types
//!
//! Structured error types for takeoff_core. Errors carry enough context for
//! a caller (UI, CLI, or an LLM driving the API) to explain what went wrong
//! without parsing message strings.
//!
//! Only file-level problems are errors. Row-level problems during an import
//! (empty key, short rows) are skipped and counted, and catalog lookups that
//! miss return zero rather than failing.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::errors::{TakeoffError, TakeoffResult};
//!
//! fn validate_length(length_in: f64) -> TakeoffResult<()> {
//!     if length_in < 0.0 {
//!         return Err(TakeoffError::InvalidInput {
//!             field: "length_inches".to_string(),
//!             value: length_in.to_string(),
//!             reason: "Length cannot be negative".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for takeoff_core operations
pub type TakeoffResult<T> = Result<T, TakeoffError>;

/// Structured error type for catalog, import and costing operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum TakeoffError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The import source had no rows at all
    #[error("Empty input: {source_name} contains no rows")]
    EmptyInput { source_name: String },

    /// A required column could not be resolved from the header row
    #[error("Missing column: none of [{candidates}] found in header")]
    MissingColumn { candidates: String },

    /// No row in the scanned region looked like a header
    #[error("Header not found: no row within the first {scanned_rows} rows has at least {min_cells} non-empty cells")]
    HeaderNotFound { scanned_rows: usize, min_cells: usize },

    /// Shape not present in the catalog
    #[error("Shape not found: {shape}")]
    ShapeNotFound { shape: String },

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
}

impl TakeoffError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        TakeoffError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an EmptyInput error
    pub fn empty_input(source_name: impl Into<String>) -> Self {
        TakeoffError::EmptyInput {
            source_name: source_name.into(),
        }
    }

    /// Create a MissingColumn error from the list of accepted header names
    pub fn missing_column(candidates: &[&str]) -> Self {
        TakeoffError::MissingColumn {
            candidates: candidates.join(", "),
        }
    }

    /// Create a ShapeNotFound error
    pub fn shape_not_found(shape: impl Into<String>) -> Self {
        TakeoffError::ShapeNotFound {
            shape: shape.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        TakeoffError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        TakeoffError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        TakeoffError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TakeoffError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            TakeoffError::InvalidInput { .. } => "INVALID_INPUT",
            TakeoffError::EmptyInput { .. } => "EMPTY_INPUT",
            TakeoffError::MissingColumn { .. } => "MISSING_COLUMN",
            TakeoffError::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            TakeoffError::ShapeNotFound { .. } => "SHAPE_NOT_FOUND",
            TakeoffError::FileError { .. } => "FILE_ERROR",
            TakeoffError::FileLocked { .. } => "FILE_LOCKED",
            TakeoffError::SerializationError { .. } => "SERIALIZATION_ERROR",
            TakeoffError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
