//! Site transports for parcel
//!
//! A site is anywhere bundles can be resolved from and published to. This
//! crate defines the [`Site`] capability and three implementations:
//!
//! - [`LocalSite`]: the local repository, whose resolutions carry no site
//! - [`FilesystemSite`]: a repository on a mounted volume or network share
//! - [`HttpSite`]: a read-only site served over HTTP with a JSON index

pub mod filesystem;
pub mod http;
pub mod local;
pub mod query;
pub mod resolution;
pub mod site;

// Re-export main types
pub use filesystem::FilesystemSite;
pub use http::{HttpSite, RetryConfig};
pub use local::LocalSite;
pub use query::Query;
pub use resolution::{Locator, Resolution};
pub use site::Site;

use parcel_core::error::ParcelError;

/// Result type for site operations
pub type SiteResult<T> = Result<T, ParcelError>;
