//! Explicit resolution context.
//!
//! Holds the ordered site list and the local repository every resolver,
//! fetch and publish runs against. Nothing here is global; callers build a
//! context from configuration and pass it down.

use parcel_bundle::{Bundle, LocalRepository, ProgressObserver};
use parcel_core::error::ParcelError;
use parcel_core::{ArchiveType, Constraint};
use parcel_site::{Query, Site};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::resolver::Resolver;
use crate::ResolverResult;

#[derive(Clone)]
pub struct ResolverContext {
    sites: Vec<Arc<dyn Site>>,
    repository: Arc<LocalRepository>,
}

impl ResolverContext {
    pub fn new(repository: Arc<LocalRepository>) -> Self {
        Self {
            sites: Vec::new(),
            repository,
        }
    }

    /// Open the local repository at `root`
    pub fn open(root: impl AsRef<Path>) -> ResolverResult<Self> {
        let repository = LocalRepository::open(root.as_ref())?;
        Ok(Self::new(Arc::new(repository)))
    }

    pub fn with_site(mut self, site: Arc<dyn Site>) -> Self {
        self.add_site(site);
        self
    }

    /// Append a site; earlier sites win version ties
    pub fn add_site(&mut self, site: Arc<dyn Site>) {
        self.sites.push(site);
    }

    pub fn sites(&self) -> &[Arc<dyn Site>] {
        &self.sites
    }

    /// Look a site up by name
    pub fn site(&self, name: &str) -> Option<&Arc<dyn Site>> {
        self.sites.iter().find(|site| site.name() == name)
    }

    pub fn repository(&self) -> &Arc<LocalRepository> {
        &self.repository
    }

    /// A resolver for `id` under `constraint` over this context's sites
    pub fn resolver(&self, id: impl Into<String>, constraint: Constraint) -> Resolver {
        Resolver::new(
            Query::new(id, constraint),
            self.sites.clone(),
            Arc::clone(&self.repository),
        )
    }

    /// Resolve `id` and make the winning bundle available locally.
    ///
    /// Returns `Ok(None)` when no site or local bundle matches.
    pub async fn fetch_dependency(
        &self,
        id: impl Into<String>,
        constraint: Constraint,
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Option<Bundle>> {
        let mut resolver = self.resolver(id, constraint);
        resolver.fetch(&self.repository, observer).await
    }

    /// Fetch every requested dependency in order.
    ///
    /// Unresolvable requests are collected into one `ResolutionFailure`
    /// after all others have been fetched.
    pub async fn fetch_all(
        &self,
        requests: &[(String, Constraint)],
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Vec<Bundle>> {
        let mut bundles = Vec::with_capacity(requests.len());
        let mut missing = Vec::new();

        for (id, constraint) in requests {
            match self.fetch_dependency(id.clone(), constraint.clone(), observer).await? {
                Some(bundle) => bundles.push(bundle),
                None => missing.push((id.as_str(), constraint.to_string())),
            }
        }

        if !missing.is_empty() {
            return Err(ParcelError::ResolutionFailure {
                id: missing.iter().map(|(id, _)| *id).collect::<Vec<_>>().join(", "),
                constraint: missing
                    .iter()
                    .map(|(_, constraint)| constraint.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(bundles)
    }

    /// Pack `source` into the local repository as `id` at `version`
    pub fn pack(
        &self,
        source: &Path,
        id: &str,
        version: &str,
        archive_type: ArchiveType,
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Bundle> {
        let mut bundle = self.repository.bundle(id, version, archive_type)?;
        bundle.pack(source, observer)?;
        Ok(bundle)
    }

    /// Pack `source` locally, then publish it to the site named `site_name`
    pub async fn publish(
        &self,
        source: &Path,
        id: &str,
        version: &str,
        archive_type: ArchiveType,
        site_name: &str,
        observer: &dyn ProgressObserver,
    ) -> ResolverResult<Bundle> {
        let site = self.site(site_name).ok_or_else(|| ParcelError::ConfigValidation {
            field: "site".to_string(),
            reason: format!(
                "no site named '{}' (configured: {})",
                site_name,
                self.site_names().join(", ")
            ),
        })?;

        let bundle = self.pack(source, id, version, archive_type, observer)?;
        site.publish(&bundle, observer).await?;
        info!("Published {} to {}", bundle, site.name());
        Ok(bundle)
    }

    fn site_names(&self) -> Vec<&str> {
        self.sites.iter().map(|site| site.name()).collect()
    }
}

impl fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("sites", &self.site_names())
            .field("repository", &self.repository.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_bundle::NoProgress;
    use parcel_site::FilesystemSite;
    use std::fs;
    use tempfile::tempdir;

    fn write_source(root: &Path, marker: &str) {
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin").join("tool"), marker).unwrap();
        fs::write(root.join("README"), "parcel").unwrap();
    }

    #[tokio::test]
    async fn test_publish_then_fetch_elsewhere() {
        let temp = tempdir().unwrap();
        let site: Arc<dyn Site> =
            Arc::new(FilesystemSite::open("shared", temp.path().join("shared")).unwrap());
        let source = temp.path().join("source");
        write_source(&source, "v2");

        let producer = ResolverContext::open(temp.path().join("producer"))
            .unwrap()
            .with_site(Arc::clone(&site));
        let published = producer
            .publish(&source, "tool", "2.0.0", ArchiveType::TarGz, "shared", &NoProgress)
            .await
            .unwrap();
        assert!(published.exists());

        let consumer = ResolverContext::open(temp.path().join("consumer"))
            .unwrap()
            .with_site(site);
        let fetched = consumer
            .fetch_dependency("tool", ">=1.0.0".parse().unwrap(), &NoProgress)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.archive_type(), ArchiveType::TarGz);
        assert_eq!(fetched.repository(), consumer.repository().root());
        assert_eq!(fetched.content_hash().unwrap(), published.content_hash().unwrap());

        let out = temp.path().join("out");
        fetched.extract(&out, &NoProgress).unwrap();
        assert_eq!(fs::read_to_string(out.join("bin").join("tool")).unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_publish_to_unknown_site() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        write_source(&source, "v1");

        let context = ResolverContext::open(temp.path().join("repo")).unwrap();
        let err = context
            .publish(&source, "tool", "1.0.0", ArchiveType::Zip, "nowhere", &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ParcelError::ConfigValidation { .. }));
        assert!(!context.repository().root().join("tool").exists());
    }

    #[tokio::test]
    async fn test_fetch_all_reports_missing() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        write_source(&source, "v1");

        let context = ResolverContext::open(temp.path().join("repo")).unwrap();
        context
            .pack(&source, "tool", "1.0.0", ArchiveType::Zip, &NoProgress)
            .unwrap();

        let found = context
            .fetch_all(&[("tool".to_string(), ">0.1".parse().unwrap())], &NoProgress)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let err = context
            .fetch_all(
                &[
                    ("tool".to_string(), ">0.1".parse().unwrap()),
                    ("bar".to_string(), ">=2.0.0".parse().unwrap()),
                ],
                &NoProgress,
            )
            .await
            .unwrap_err();
        match err {
            ParcelError::ResolutionFailure { id, constraint } => {
                assert_eq!(id, "bar");
                assert_eq!(constraint, ">=2.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_site_lookup_and_order() {
        let temp = tempdir().unwrap();
        let first: Arc<dyn Site> =
            Arc::new(FilesystemSite::open("first", temp.path().join("a")).unwrap());
        let second: Arc<dyn Site> =
            Arc::new(FilesystemSite::open("second", temp.path().join("b")).unwrap());

        let context = ResolverContext::open(temp.path().join("repo"))
            .unwrap()
            .with_site(first)
            .with_site(second);

        let names: Vec<_> = context.sites().iter().map(|site| site.name()).collect();
        assert_eq!(names, ["first", "second"]);
        assert!(context.site("second").is_some());
        assert!(context.site("third").is_none());
        assert!(format!("{context:?}").contains("first"));
    }
}
