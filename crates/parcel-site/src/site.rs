//! The site capability.

use async_trait::async_trait;
use parcel_bundle::{Bundle, LocalRepository, Manifest, ProgressObserver};
use std::fmt;

use crate::query::Query;
use crate::resolution::Resolution;
use crate::SiteResult;

/// A source and destination for bundles.
///
/// Implementations return site-less resolutions from [`Site::resolve`];
/// the resolver attaches the site it queried. A site that cannot be
/// reached returns an error, which the resolver logs and skips.
#[async_trait]
pub trait Site: Send + Sync + fmt::Debug {
    /// Name used in logs and configuration
    fn name(&self) -> &str;

    /// Every bundle this site offers that matches `query`, in any order
    async fn resolve(&self, query: &Query) -> SiteResult<Vec<Resolution>>;

    /// Copy the archive behind `resolution` into `destination` at
    /// `<root>/<id>/<version>/<archive>` and return the installed bundle
    async fn fetch(
        &self,
        resolution: &Resolution,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<Bundle>;

    /// Store a bundle's archive on this site and update the site manifest
    async fn publish(&self, bundle: &Bundle, observer: &dyn ProgressObserver) -> SiteResult<()>;

    /// The site manifest
    async fn index(&self) -> SiteResult<Manifest>;
}
