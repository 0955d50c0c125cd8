//! Configuration for parcel
//!
//! This crate parses and validates `parcel.toml`: the local repository
//! root, the default archive type, and the ordered list of sites. The file
//! is declarative data only. It also locates the file, applies
//! environment and command-line overrides, and builds the configured
//! sites.

pub mod merge;
pub mod sites;
pub mod toml;

// Re-export main types
pub use crate::merge::{ConfigLayering, ConfigLoader, ConfigSource, CONFIG_FILE};
pub use crate::sites::build_sites;
pub use crate::toml::{ParcelToml, RepositorySection, SiteKind, SiteSection};

use parcel_core::error::ParcelError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ParcelError>;
