//! Bundle packaging for parcel
//!
//! This crate turns directory trees into versioned archives and back. It
//! supports zip, gzip-compressed tar and bzip2-compressed tar, preserving
//! empty directories, symlinks and permission bits. It also provides the
//! JSON manifest format and the local repository that caches bundles on
//! disk as `<root>/<id>/<version>/<id>_<version><ext>`.

pub mod archive;
pub mod bundle;
pub mod manifest;
pub mod progress;
pub mod repository;

// Re-export main types
pub use archive::{extract_archive, list_entries, pack_directory};
pub use bundle::Bundle;
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE};
pub use progress::{Action, NoProgress, ProgressObserver};
pub use repository::LocalRepository;

use parcel_core::error::ParcelError;

/// Result type for bundle operations
pub type BundleResult<T> = Result<T, ParcelError>;
