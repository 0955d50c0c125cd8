//! The local repository as a site.

use async_trait::async_trait;
use parcel_bundle::{Action, Bundle, LocalRepository, Manifest, ProgressObserver};
use std::sync::Arc;
use url::Url;

use crate::query::Query;
use crate::resolution::{Locator, Resolution};
use crate::site::Site;
use crate::SiteResult;

/// Resolves against bundles already present in a [`LocalRepository`]
#[derive(Debug, Clone)]
pub struct LocalSite {
    name: String,
    repository: Arc<LocalRepository>,
}

impl LocalSite {
    pub fn new(repository: Arc<LocalRepository>) -> Self {
        Self::named("local", repository)
    }

    pub fn named(name: impl Into<String>, repository: Arc<LocalRepository>) -> Self {
        Self {
            name: name.into(),
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<LocalRepository> {
        &self.repository
    }

    /// Scan `<root>/<id>/` for version directories matching `query`
    pub fn scan(&self, query: &Query) -> SiteResult<Vec<Resolution>> {
        let bundles = self.repository.matching(&query.id, &query.constraint)?;

        Ok(bundles
            .into_iter()
            .map(|bundle| {
                let dir = bundle.local_path();
                let mut locator = Locator::path(&dir);
                if let Ok(url) = Url::from_directory_path(&dir) {
                    locator = locator.with_url(url.to_string());
                }
                Resolution::new(bundle, locator)
            })
            .collect())
    }

    /// Copy the resolution's archive into `destination`, unless it is
    /// already there
    pub fn copy_into(
        &self,
        resolution: &Resolution,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<Bundle> {
        let bundle = resolution.bundle();
        destination.install_archive(
            &bundle.local_archive(),
            bundle.id(),
            bundle.version_label(),
            bundle.archive_type(),
            Action::Download,
            observer,
        )
    }
}

#[async_trait]
impl Site for LocalSite {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, query: &Query) -> SiteResult<Vec<Resolution>> {
        self.scan(query)
    }

    async fn fetch(
        &self,
        resolution: &Resolution,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<Bundle> {
        self.copy_into(resolution, destination, observer)
    }

    async fn publish(&self, bundle: &Bundle, observer: &dyn ProgressObserver) -> SiteResult<()> {
        self.repository.publish(bundle, observer).map(|_| ())
    }

    async fn index(&self) -> SiteResult<Manifest> {
        self.repository.manifest()
    }
}
