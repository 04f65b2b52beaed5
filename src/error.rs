//! Error types and handling infrastructure for lineview.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context.
//!
//! ## Design Principles
//!
//! - **User-friendly messages**: Errors should provide actionable feedback
//! - **Context preservation**: Include relevant information for debugging
//! - **No silent degradation**: index, read and search failures always reach the caller
//! - **Consistency**: Standardized Result type across all modules

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for lineview operations.
///
/// Cancellation (a search hitting its result limit, or a consumer going away) is
/// not represented here; it is a normal terminal state reported through
/// [`SearchStatus`](crate::search::SearchStatus).
#[derive(Error, Debug)]
pub enum LineviewError {
    /// File system related errors (open, read, write, rename)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Search expression could not be compiled
    #[error("Invalid search pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The session's line offsets no longer describe the file on disk
    #[error("Session is stale, re-open the file: {path}")]
    StaleSession { path: PathBuf },

    /// An operation needed an open session and none is registered
    #[error("No open session for: {path}")]
    NoSession { path: PathBuf },

    /// Edit set targets lines that do not exist
    #[error("Invalid edit: {message}")]
    InvalidEdit { message: String },

    /// UI and terminal related errors
    #[error("UI operation failed: {message}")]
    UIError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for lineview operations.
pub type Result<T> = std::result::Result<T, LineviewError>;

impl LineviewError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidPattern error for the given pattern
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a StaleSession error for the given path
    pub fn stale(path: impl Into<PathBuf>) -> Self {
        Self::StaleSession { path: path.into() }
    }

    /// Create an InvalidEdit error with a descriptive message
    pub fn invalid_edit(message: impl Into<String>) -> Self {
        Self::InvalidEdit {
            message: message.into(),
        }
    }

    /// Create a UIError with a descriptive message
    pub fn ui(message: impl Into<String>) -> Self {
        Self::UIError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether re-opening the file (re-indexing) would resolve this error
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleSession { .. })
    }
}

// Automatic conversion from io::Error to LineviewError
impl From<std::io::Error> for LineviewError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
