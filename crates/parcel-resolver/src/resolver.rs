//! Single-request resolver.
//!
//! Remote sites are queried in order and the highest version wins; on a
//! tie the earlier site keeps the slot. Local candidates are considered
//! after every remote site and win ties, so a bundle already on disk is
//! never fetched again.

use parcel_bundle::{Bundle, LocalRepository, ProgressObserver};
use parcel_core::error::ParcelError;
use parcel_core::Constraint;
use parcel_site::{LocalSite, Query, Resolution, Site};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ResolverResult;

/// Which candidate sources a resolution pass consults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub remote: bool,
    pub local: bool,
}

impl ResolveOptions {
    pub fn local_only() -> Self {
        Self {
            remote: false,
            local: true,
        }
    }

    pub fn remote_only() -> Self {
        Self {
            remote: true,
            local: false,
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            remote: true,
            local: true,
        }
    }
}

/// Resolves one `(id, constraint)` request.
///
/// States: unresolved, resolved, failed. A failure is reported once per
/// resolver no matter how often `resolve` is called.
#[derive(Debug)]
pub struct Resolver {
    query: Query,
    sites: Vec<Arc<dyn Site>>,
    local: LocalSite,
    resolution: Option<Resolution>,
    failure_reported: bool,
}

impl Resolver {
    pub fn new(query: Query, sites: Vec<Arc<dyn Site>>, repository: Arc<LocalRepository>) -> Self {
        Self {
            query,
            sites,
            local: LocalSite::new(repository),
            resolution: None,
            failure_reported: false,
        }
    }

    /// Build a resolver for `id` under `constraint`
    pub fn for_id(
        id: impl Into<String>,
        constraint: Constraint,
        sites: Vec<Arc<dyn Site>>,
        repository: Arc<LocalRepository>,
    ) -> Self {
        Self::new(Query::new(id, constraint), sites, repository)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn sites(&self) -> &[Arc<dyn Site>] {
        &self.sites
    }

    pub fn repository(&self) -> &Arc<LocalRepository> {
        self.local.repository()
    }

    /// The current best resolution, if the last pass found one
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Run a resolution pass over remote sites and the local repository
    pub async fn resolve(&mut self) -> Option<&Resolution> {
        self.resolve_with(ResolveOptions::default()).await
    }

    /// Run a resolution pass over the sources selected by `options`.
    ///
    /// Any previous result is discarded first.
    pub async fn resolve_with(&mut self, options: ResolveOptions) -> Option<&Resolution> {
        self.resolution = None;

        if options.remote {
            self.resolve_remote().await;
        }
        if options.local {
            self.resolve_local().await;
        }

        if self.resolution.is_none() && !self.failure_reported {
            let failure = ParcelError::ResolutionFailure {
                id: self.query.id.clone(),
                constraint: self.query.constraint.to_string(),
            };
            error!("{}", failure);
            self.failure_reported = true;
        }

        self.resolution.as_ref()
    }

    async fn resolve_remote(&mut self) {
        for site in &self.sites {
            let candidates = match site.resolve(&self.query).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!("Skipping site {} while resolving {}: {}", site.name(), self.query, err);
                    continue;
                }
            };
            debug!(
                "Site {} offered {} candidate(s) for {}",
                site.name(),
                candidates.len(),
                self.query
            );

            for candidate in candidates {
                let better = match &self.resolution {
                    None => true,
                    Some(best) => candidate.version() > best.version(),
                };
                if better {
                    self.resolution = Some(candidate.with_site(Arc::clone(site)));
                }
            }
        }

        if let Some(best) = &self.resolution {
            info!("Resolved {} to {} at {}", self.query, best, best.locator());
        }
    }

    async fn resolve_local(&mut self) {
        let candidates = match self.local.resolve(&self.query).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(
                    "Unable to scan local repository {}: {}",
                    self.local.repository().root().display(),
                    err
                );
                return;
            }
        };

        for candidate in candidates {
            let better = match &self.resolution {
                None => true,
                Some(best) => candidate.version() >= best.version(),
            };
            if better {
                debug!("Local candidate {} takes precedence", candidate);
                self.resolution = Some(candidate);
            }
        }
    }

    /// Make the resolved bundle available in `destination`.
    ///
    /// Resolves first when no pass has run yet. Returns `Ok(None)` when
    /// nothing matches. A local resolution is returned as is, without any
    /// transfer.
    pub async fn fetch(
        &mut self,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Option<Bundle>> {
        if self.resolution.is_none() {
            self.resolve().await;
        }
        let Some(resolution) = self.resolution.clone() else {
            return Ok(None);
        };

        match resolution.site() {
            Some(site) => {
                info!("Fetching {} into {}", resolution, destination.root().display());
                let bundle = site.fetch(&resolution, destination, observer).await?;
                Ok(Some(bundle))
            }
            None => {
                info!("Using local copy of {}", resolution);
                Ok(Some(resolution.bundle().clone()))
            }
        }
    }

    /// Fetch into the repository this resolver scans for local candidates
    pub async fn fetch_local(
        &mut self,
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Option<Bundle>> {
        let repository = Arc::clone(self.local.repository());
        self.fetch(&repository, observer).await
    }
}
