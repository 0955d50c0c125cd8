//! Resolutions: candidate matches returned by sites.

use parcel_bundle::Bundle;
use parcel_core::{ArchiveType, Version};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::site::Site;
use crate::SiteResult;

/// Where a resolution's archive can be found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    pub url: Option<String>,
    pub path: Option<PathBuf>,
}

impl Locator {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            path: None,
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            url: None,
            path: Some(path.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.url, &self.path) {
            (Some(url), _) => f.write_str(url),
            (None, Some(path)) => write!(f, "{}", path.display()),
            (None, None) => f.write_str("<unknown>"),
        }
    }
}

/// A candidate bundle for a query.
///
/// `site` is `None` for bundles already in the local repository.
/// Resolutions compare by version only.
#[derive(Clone)]
pub struct Resolution {
    bundle: Bundle,
    site: Option<Arc<dyn Site>>,
    locator: Locator,
}

impl Resolution {
    pub fn new(bundle: Bundle, locator: Locator) -> Self {
        Self {
            bundle,
            site: None,
            locator,
        }
    }

    /// Attach the site this resolution came from
    pub fn with_site(mut self, site: Arc<dyn Site>) -> Self {
        self.site = Some(site);
        self
    }

    pub fn id(&self) -> &str {
        self.bundle.id()
    }

    pub fn version(&self) -> &Version {
        self.bundle.version()
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn site(&self) -> Option<&Arc<dyn Site>> {
        self.site.as_ref()
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn is_local(&self) -> bool {
        self.site.is_none()
    }

    pub fn archive_type(&self) -> ArchiveType {
        self.bundle.archive_type()
    }

    /// SHA-1 of the archive.
    ///
    /// Local resolutions hash their bundle; remote ones look the hash up in
    /// the site index without fetching the archive.
    pub async fn sha1(&self) -> SiteResult<Option<String>> {
        match &self.site {
            None => self.bundle.content_hash().map(Some),
            Some(site) => {
                let index = site.index().await?;
                Ok(index
                    .get(self.bundle.id(), self.bundle.version_label())
                    .map(|entry| entry.sha1.clone()))
            }
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("id", &self.bundle.id())
            .field("version", &self.bundle.version_label())
            .field("site", &self.site.as_ref().map(|site| site.name().to_string()))
            .field("locator", &self.locator)
            .finish()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.site.as_ref().map(|site| site.name()).unwrap_or("local");
        write!(f, "{} {} from {}", self.bundle.id(), self.bundle.version_label(), origin)
    }
}

impl PartialEq for Resolution {
    fn eq(&self, other: &Self) -> bool {
        self.version() == other.version()
    }
}

impl PartialOrd for Resolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.version().cmp(other.version()))
    }
}
