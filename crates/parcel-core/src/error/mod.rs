//! Error types and result aliases for parcel operations.
//!
//! Provides a unified error type that covers version parsing, archive
//! handling, site transports, and configuration with actionable messages.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all parcel operations
#[derive(Error, Debug)]
pub enum ParcelError {
    // Version errors
    #[error("Invalid version '{input}': {reason}")]
    Format { input: String, reason: String },

    // Bundle errors
    #[error("Nothing to pack: {} contains no files or directories", path.display())]
    EmptySource { path: PathBuf },

    #[error("Archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    #[error("{bundle} is already stored at {}", path.display())]
    BundleExists { bundle: String, path: PathBuf },

    #[error("Archive error in {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("Refusing to extract entry '{entry}': path escapes the destination")]
    UnsafePath { entry: String },

    #[error("Integrity check failed for {bundle}: expected {expected}, got {actual}")]
    IntegrityFailure {
        bundle: String,
        expected: String,
        actual: String,
    },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    // Resolution errors
    #[error("Unable to resolve {id} {constraint}: no site offered a matching bundle")]
    ResolutionFailure { id: String, constraint: String },

    // Site errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Site '{site}' does not support publishing")]
    PublishUnsupported { site: String },

    #[error("Failed to parse manifest {location}: {message}")]
    ManifestParse { location: String, message: String },

    // Config errors
    #[error("Failed to parse {file}: {message} at line {line}, column {column}")]
    TomlParse {
        file: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for parcel operations
pub type ParcelResult<T> = Result<T, ParcelError>;

impl ParcelError {
    /// Create a network error from any error type
    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an archive error for the archive at `path`
    pub fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is transient and worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ParcelError::Network { .. } | ParcelError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ParcelError::Format { .. } => Some(
                "Versions are dot-separated and must start with an integer, e.g. 1.2.0sp1",
            ),
            ParcelError::EmptySource { .. } => {
                Some("Add at least one file to the directory before packing")
            }
            ParcelError::ArchiveNotFound { .. } => {
                Some("Pack the bundle first or fetch it into the local repository")
            }
            ParcelError::BundleExists { .. } => {
                Some("Stored archives never change; publish the new content under a new version")
            }
            ParcelError::ResolutionFailure { .. } => {
                Some("Check the identifier spelling, widen the version constraint, or add a site")
            }
            ParcelError::Network { .. } => Some("Check your network connection and try again"),
            ParcelError::IntegrityFailure { .. } => Some(
                "The archive differs from the site's manifest; republish or fetch it again",
            ),
            ParcelError::PublishUnsupported { .. } => {
                Some("Publish to a filesystem site and serve that directory over HTTP")
            }
            _ => None,
        }
    }
}
