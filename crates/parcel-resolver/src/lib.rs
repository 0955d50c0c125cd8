//! Resolution engine for parcel
//!
//! A [`Resolver`] answers one request: the best bundle for an identifier
//! and version constraint across a list of remote sites and the local
//! repository. Remote candidates compete on version alone; a local
//! candidate wins any tie so cached archives are never downloaded again.
//!
//! [`ResolverContext`] holds the explicit site list and repository that
//! resolvers are built from, and the pack/publish entry points.

pub mod context;
pub mod resolver;

// Re-export main types
pub use context::ResolverContext;
pub use resolver::{ResolveOptions, Resolver};

use parcel_core::error::ParcelError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ParcelError>;
