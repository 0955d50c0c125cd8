//! # parcel-core
//!
//! Core types and utilities shared across all parcel crates.
//!
//! This crate provides:
//! - The dotted `Version` type with annotated segments and its ordering
//! - `Op` and `Constraint` for matching candidate versions
//! - `ArchiveType` naming the three supported archive formats
//! - `ParcelError` enum for unified error handling
//! - SHA-1 and path helpers used by the archive engine
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Constraint, ArchiveType)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ParcelError, ParcelResult};
pub use types::{ArchiveType, Constraint, Op, Version};
