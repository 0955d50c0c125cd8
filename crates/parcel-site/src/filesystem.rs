//! Directory-backed remote site.
//!
//! A filesystem site is a repository on a mounted volume or network share.
//! It resolves by scanning version directories, fetches by copying, and
//! publishes by copying the archive in and rewriting its manifest.
//!
//! Opening a site never touches the disk. An unmounted share only fails the
//! operations that need it, and the first publish creates the root.

use async_trait::async_trait;
use parcel_bundle::{Bundle, LocalRepository, Manifest, ProgressObserver};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::local::LocalSite;
use crate::query::Query;
use crate::resolution::Resolution;
use crate::site::Site;
use crate::SiteResult;

#[derive(Debug, Clone)]
pub struct FilesystemSite {
    inner: LocalSite,
}

impl FilesystemSite {
    /// A site rooted at `path`; the directory need not exist yet
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> SiteResult<Self> {
        let repository = Arc::new(LocalRepository::attach(path));
        Ok(Self {
            inner: LocalSite::named(name, repository),
        })
    }

    pub fn root(&self) -> &Path {
        self.inner.repository().root()
    }
}

#[async_trait]
impl Site for FilesystemSite {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn resolve(&self, query: &Query) -> SiteResult<Vec<Resolution>> {
        self.inner.repository().check_available()?;
        self.inner.scan(query)
    }

    async fn fetch(
        &self,
        resolution: &Resolution,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<Bundle> {
        let installed = self.inner.copy_into(resolution, destination, observer)?;

        // A manifest entry, when present, must agree with what was copied
        let index = self.inner.repository().manifest()?;
        if let Some(entry) = index.get(installed.id(), installed.version_label()) {
            if let Err(err) = installed.verify(&entry.sha1) {
                let _ = destination.remove(installed.id(), installed.version_label());
                return Err(err);
            }
        }

        tracing::info!("Fetched {} from {}", installed, self.root().display());
        Ok(installed)
    }

    async fn publish(&self, bundle: &Bundle, observer: &dyn ProgressObserver) -> SiteResult<()> {
        self.inner.repository().publish(bundle, observer)?;
        Ok(())
    }

    async fn index(&self) -> SiteResult<Manifest> {
        self.inner.repository().check_available()?;
        self.inner.repository().manifest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_bundle::NoProgress;
    use parcel_core::error::ParcelError;
    use parcel_core::{ArchiveType, Op};
    use std::fs;
    use tempfile::tempdir;

    fn packed(root: &Path, id: &str, version: &str) -> Bundle {
        let source = tempdir().unwrap();
        fs::write(source.path().join("data.txt"), format!("{id}-{version}")).unwrap();
        let mut bundle = Bundle::new(id, version, ArchiveType::TarGz, root).unwrap();
        bundle.pack(source.path(), &NoProgress).unwrap();
        bundle
    }

    #[tokio::test]
    async fn test_publish_resolve_fetch() {
        let temp = tempdir().unwrap();
        let site = FilesystemSite::open("share", temp.path().join("share")).unwrap();
        let local = LocalRepository::open(temp.path().join("local")).unwrap();

        let bundle = packed(&temp.path().join("work"), "foo", "1.2.0");
        site.publish(&bundle, &NoProgress).await.unwrap();
        assert!(site.index().await.unwrap().get("foo", "1.2.0").is_some());

        let query = Query::parse("foo", Op::GreaterEq, "1.0.0").unwrap();
        let resolutions = site.resolve(&query).await.unwrap();
        assert_eq!(resolutions.len(), 1);

        let installed = site.fetch(&resolutions[0], &local, &NoProgress).await.unwrap();
        assert_eq!(installed.repository(), local.root());
        assert!(local.root().join("foo/1.2.0/foo_1.2.0.tar.gz").is_file());
        assert_eq!(installed.content_hash().unwrap(), bundle.content_hash().unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_share_fails_only_its_own_operations() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        // Opening succeeds even though the root can never be created
        let site = FilesystemSite::open("offline", blocker.join("mnt")).unwrap();
        let query = Query::parse("foo", Op::GreaterEq, "1.0.0").unwrap();

        assert!(matches!(site.resolve(&query).await, Err(ParcelError::Io { .. })));
        assert!(site.index().await.is_err());
        assert!(!blocker.join("mnt").exists());
    }

    #[tokio::test]
    async fn test_fetch_detects_tampering() {
        let temp = tempdir().unwrap();
        let site = FilesystemSite::open("share", temp.path().join("share")).unwrap();
        let local = LocalRepository::open(temp.path().join("local")).unwrap();

        let bundle = packed(&temp.path().join("work"), "foo", "1.0.0");
        site.publish(&bundle, &NoProgress).await.unwrap();

        // Corrupt the stored archive behind the manifest's back
        fs::write(site.root().join("foo/1.0.0/foo_1.0.0.tar.gz"), b"garbage").unwrap();

        let query = Query::parse("foo", Op::Exact, "1.0.0").unwrap();
        let resolution = site.resolve(&query).await.unwrap().remove(0);
        let result = site.fetch(&resolution, &local, &NoProgress).await;

        assert!(matches!(result, Err(ParcelError::IntegrityFailure { .. })));
        assert!(local.find("foo", "1.0.0").unwrap().is_none());
    }
}
