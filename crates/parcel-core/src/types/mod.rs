//! Core data types for parcel.
//!
//! - [`Version`]: dotted versions with annotated segments
//! - [`Constraint`] and [`Op`]: version constraints used when resolving
//! - [`ArchiveType`]: the archive formats a bundle can be packaged as

pub mod archive;
pub mod constraint;
pub mod version;

pub use archive::ArchiveType;
pub use constraint::{Constraint, Op};
pub use version::Version;
