//! Error handling for kittgen.
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the library should use these types for consistency.

use crate::yaml::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kittgen.
#[derive(Error, Debug)]
pub enum KittgenError {
    /// IO errors (file operations, directory walks)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor parse errors, tagged with the file they came from
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Rollback errors (missing backup store, unreadable snapshots)
    #[error("rollback error: {0}")]
    Rollback(String),

    /// Invalid run input (bad repo path, empty country list)
    #[error("validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors (report, manifest)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for kittgen operations.
pub type Result<T> = std::result::Result<T, KittgenError>;

// Convenient error constructors
impl KittgenError {
    /// Create a parse error tagged with its source file.
    pub fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse { path: path.into(), source }
    }

    /// Create a rollback error
    pub fn rollback(msg: impl Into<String>) -> Self {
        Self::Rollback(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}
