//! Local bundle repository.
//!
//! Bundles live at `<root>/<id>/<version>/<id>_<version><ext>`. The
//! repository discovers them lazily by scanning version directories and
//! caches what it finds. Publishing writes the archive before touching
//! the manifest, and is serialized across threads.

use dashmap::DashMap;
use parcel_core::error::ParcelError;
use parcel_core::utils::check_path_segment;
use parcel_core::{ArchiveType, Constraint, Version};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::bundle::Bundle;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::progress::{copy_chunked, Action, ProgressObserver};
use crate::BundleResult;

/// Repository of cached bundles on the local disk
#[derive(Debug)]
pub struct LocalRepository {
    root: PathBuf,
    cache: DashMap<(String, String), Bundle>,
    publish_lock: Mutex<()>,
}

impl LocalRepository {
    /// Open (and create if needed) a repository rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> BundleResult<Self> {
        let repository = Self::attach(root);
        fs::create_dir_all(&repository.root).map_err(|e| {
            ParcelError::io(format!("Failed to create repository {}", repository.root.display()), e)
        })?;
        Ok(repository)
    }

    /// A repository at `root` without touching the disk.
    ///
    /// Nothing is created until the first publish.
    pub fn attach(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: DashMap::new(),
            publish_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail unless the root directory exists and can be listed
    pub fn check_available(&self) -> BundleResult<()> {
        fs::read_dir(&self.root).map(|_| ()).map_err(|e| {
            ParcelError::io(format!("Repository {} is unavailable", self.root.display()), e)
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// A bundle handle in this repository; the archive need not exist yet
    pub fn bundle(
        &self,
        id: &str,
        version: &str,
        archive_type: ArchiveType,
    ) -> BundleResult<Bundle> {
        Bundle::new(id, version, archive_type, &self.root)
    }

    /// Find the archive installed for `id` at `version`
    pub fn find(&self, id: &str, version: &str) -> BundleResult<Option<Bundle>> {
        check_path_segment(id)?;
        check_path_segment(version)?;

        let key = (id.to_string(), version.to_string());

        if let Some(cached) = self.cache.get(&key) {
            if cached.exists() {
                return Ok(Some(cached.clone()));
            }
        }
        self.cache.remove(&key);

        let dir = self.root.join(id).join(version);
        let Ok(listing) = fs::read_dir(&dir) else {
            return Ok(None);
        };

        for entry in listing {
            let entry = entry
                .map_err(|e| ParcelError::io(format!("Failed to scan {}", dir.display()), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            let Some(archive_type) = ArchiveType::from_file_name(&name) else {
                continue;
            };
            if name != archive_type.file_name(id, version) {
                continue;
            }

            let bundle = self.bundle(id, version, archive_type)?;
            self.cache.insert(key, bundle.clone());
            return Ok(Some(bundle));
        }

        Ok(None)
    }

    /// Version directories under `<root>/<id>/`, oldest first.
    ///
    /// Directory names that are not versions are skipped.
    pub fn versions(&self, id: &str) -> BundleResult<Vec<String>> {
        check_path_segment(id)?;
        let dir = self.root.join(id);
        let mut versions = subdirectories(&dir)?
            .into_iter()
            .filter_map(|name| match name.parse::<Version>() {
                Ok(version) => Some((version, name)),
                Err(_) => {
                    debug!("Skipping {}: not a version directory", dir.join(&name).display());
                    None
                }
            })
            .collect::<Vec<_>>();

        versions.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(versions.into_iter().map(|(_, name)| name).collect())
    }

    /// Every installed bundle
    pub fn bundles(&self) -> BundleResult<Vec<Bundle>> {
        let mut bundles = Vec::new();
        for id in subdirectories(&self.root)? {
            for version in self.versions(&id)? {
                if let Some(bundle) = self.find(&id, &version)? {
                    bundles.push(bundle);
                }
            }
        }
        Ok(bundles)
    }

    /// Installed bundles of `id` whose version satisfies `constraint`
    pub fn matching(&self, id: &str, constraint: &Constraint) -> BundleResult<Vec<Bundle>> {
        let mut bundles = Vec::new();
        for version in self.versions(id)? {
            if !constraint.matches_str(&version) {
                continue;
            }
            if let Some(bundle) = self.find(id, &version)? {
                bundles.push(bundle);
            }
        }
        Ok(bundles)
    }

    /// Copy an archive file into the canonical location for `id`/`version`,
    /// reporting bytes under `action`.
    ///
    /// The copy goes to a hidden partial file first and is renamed into
    /// place, so readers never see a half-written archive. A stored archive
    /// is never replaced: any existing archive for `id`/`version` fails with
    /// `BundleExists`.
    pub fn install_archive(
        &self,
        source: &Path,
        id: &str,
        version: &str,
        archive_type: ArchiveType,
        action: Action,
        observer: &dyn ProgressObserver,
    ) -> BundleResult<Bundle> {
        let bundle = self.bundle(id, version, archive_type)?;
        let target = bundle.local_archive();

        if source == target {
            return Ok(bundle);
        }
        if let Some(existing) = bundle.existing_archive() {
            return Err(ParcelError::BundleExists {
                bundle: format!("{} {}", id, version),
                path: existing,
            });
        }

        let mut input = File::open(source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParcelError::ArchiveNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                ParcelError::io(format!("Failed to open {}", source.display()), e)
            }
        })?;

        let dir = bundle.local_path();
        fs::create_dir_all(&dir)
            .map_err(|e| ParcelError::io(format!("Failed to create {}", dir.display()), e))?;

        let total = input.metadata().map(|m| m.len()).unwrap_or(0);
        observer.start(&bundle.archive_name(), action, total);

        let partial = dir.join(format!(".{}.partial", bundle.archive_name()));
        let copied = File::create(&partial)
            .map_err(|e| ParcelError::io(format!("Failed to create {}", partial.display()), e))
            .and_then(|mut output| copy_chunked(&mut input, &mut output, observer, action, true));

        if let Err(err) = copied {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }

        fs::rename(&partial, &target).map_err(|e| {
            ParcelError::io(format!("Failed to move archive into {}", target.display()), e)
        })?;
        observer.finish();

        self.cache.remove(&(id.to_string(), version.to_string()));
        Ok(bundle)
    }

    /// Store a bundle in this repository and record it in the manifest.
    ///
    /// The archive is written before the manifest is updated.
    pub fn publish(
        &self,
        bundle: &Bundle,
        observer: &dyn ProgressObserver,
    ) -> BundleResult<Bundle> {
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let stored = self.install_archive(
            &bundle.local_archive(),
            bundle.id(),
            bundle.version_label(),
            bundle.archive_type(),
            Action::Upload,
            observer,
        )?;

        let mut manifest = self.manifest()?;
        manifest.add(&stored)?;
        manifest.save(&self.manifest_path())?;

        tracing::info!("Published {} to {}", stored, self.root.display());
        Ok(stored)
    }

    /// The manifest at the repository root (empty if none was written)
    pub fn manifest(&self) -> BundleResult<Manifest> {
        Manifest::load(&self.manifest_path())
    }

    /// Delete an installed bundle and drop it from the manifest
    pub fn remove(&self, id: &str, version: &str) -> BundleResult<bool> {
        check_path_segment(id)?;
        check_path_segment(version)?;

        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.cache.remove(&(id.to_string(), version.to_string()));

        let dir = self.root.join(id).join(version);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .map_err(|e| ParcelError::io(format!("Failed to remove {}", dir.display()), e))?;

        let mut manifest = self.manifest()?;
        if manifest.remove(id, version).is_some() {
            manifest.save(&self.manifest_path())?;
        }
        Ok(true)
    }

    /// Forget cached lookups for `id`
    pub fn invalidate(&self, id: &str) {
        self.cache.retain(|(cached_id, _), _| cached_id != id);
    }
}

fn subdirectories(dir: &Path) -> BundleResult<Vec<String>> {
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ParcelError::io(format!("Failed to scan {}", dir.display()), e)),
    };

    let mut names = Vec::new();
    for entry in listing {
        let entry =
            entry.map_err(|e| ParcelError::io(format!("Failed to scan {}", dir.display()), e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
