//! Error types for contemplative-md
//!
//! This module defines all custom error types used throughout the crate.
//! Error types are organized by category so callers can tell a failed
//! pipeline apart from a bad config file or an unreadable input file.
//!
//! Note that parsing and sanitizing never fail: malformed markdown degrades
//! to a best-effort tree and disallowed markup is silently removed. Only the
//! highlighter construction and the render boundary produce errors here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// Rendering pipeline errors
    #[error(transparent)]
    Render(#[from] RenderError),

    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Errors raised while running the markdown pipeline
#[derive(Error, Debug)]
pub enum RenderError {
    /// The shared highlighter could not be constructed
    #[error(transparent)]
    Highlighter(#[from] HighlightError),

    /// A pipeline stage panicked
    #[error("A rendering stage panicked")]
    Panicked,

    /// The pipeline task was cancelled before it finished
    #[error("Rendering was cancelled")]
    Cancelled,
}

/// Syntax highlighter errors
#[derive(Error, Debug, Clone)]
pub enum HighlightError {
    /// Building the syntax set or theme failed
    #[error("Could not construct highlighter: {0}")]
    Construction(String),

    /// A supported language has no grammar in the syntax set
    #[error("No grammar available for {0}")]
    MissingSyntax(&'static str),

    /// A theme rule names an invalid scope
    #[error("Invalid theme scope {scope}: {reason}")]
    InvalidScope { scope: &'static str, reason: String },

    /// The tokenizer rejected a line
    #[error("Tokenizer failed: {0}")]
    Tokenize(String),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when accessing file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// File is too large to read at all
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path is not a file
    #[error("Path is not a file: {path}")]
    NotAFile { path: PathBuf },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for pipeline operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type alias for highlighter operations
pub type HighlightResult<T> = Result<T, HighlightError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl FileError {
    /// Create a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound(_) => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::PermissionDenied { .. } => {
                "You don't have permission to access this file. Check file permissions.".to_string()
            }
            FileError::FileTooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            _ => self.to_string(),
        }
    }
}
