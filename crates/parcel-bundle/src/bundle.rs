//! A single packaged artifact.

use parcel_core::error::ParcelError;
use parcel_core::utils::{check_path_segment, sha1_file};
use parcel_core::{ArchiveType, Version};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::archive::{extract_archive, pack_directory};
use crate::progress::ProgressObserver;
use crate::BundleResult;

/// One packaged artifact: identifier, version and archive type, living
/// under a repository root.
///
/// The version is kept exactly as written (`1.2` stays `1.2`) because it
/// names the directory and archive on disk. The content hash is computed
/// once per instance.
#[derive(Debug, Clone)]
pub struct Bundle {
    id: String,
    version: Version,
    label: String,
    archive_type: ArchiveType,
    repository: PathBuf,
    hash: OnceLock<String>,
}

impl Bundle {
    /// Create a bundle, parsing `version`.
    ///
    /// The identifier and version each name one directory, so separators
    /// and `..` are rejected with `UnsafePath`.
    pub fn new(
        id: impl Into<String>,
        version: &str,
        archive_type: ArchiveType,
        repository: impl Into<PathBuf>,
    ) -> BundleResult<Self> {
        let label = version.trim().to_string();
        let version = label.parse()?;
        Self::with_label(id.into(), version, label, archive_type, repository.into())
    }

    /// Create a bundle from an already parsed version
    pub fn from_version(
        id: impl Into<String>,
        version: Version,
        archive_type: ArchiveType,
        repository: impl Into<PathBuf>,
    ) -> BundleResult<Self> {
        let label = version.to_string();
        Self::with_label(id.into(), version, label, archive_type, repository.into())
    }

    fn with_label(
        id: String,
        version: Version,
        label: String,
        archive_type: ArchiveType,
        repository: PathBuf,
    ) -> BundleResult<Self> {
        check_path_segment(&id)?;
        check_path_segment(&label)?;

        Ok(Self {
            id,
            version,
            label,
            archive_type,
            repository,
            hash: OnceLock::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Version as written in paths and manifests
    pub fn version_label(&self) -> &str {
        &self.label
    }

    pub fn archive_type(&self) -> ArchiveType {
        self.archive_type
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// `<id>_<version><ext>`
    pub fn archive_name(&self) -> String {
        self.archive_type.file_name(&self.id, &self.label)
    }

    /// `<repository>/<id>/<version>/`
    pub fn local_path(&self) -> PathBuf {
        self.repository.join(&self.id).join(&self.label)
    }

    /// Full path of the archive file
    pub fn local_archive(&self) -> PathBuf {
        self.local_path().join(self.archive_name())
    }

    pub fn exists(&self) -> bool {
        self.local_archive().is_file()
    }

    /// Any archive already stored for this id and version, whatever its type
    pub fn existing_archive(&self) -> Option<PathBuf> {
        let dir = self.local_path();
        ArchiveType::ALL
            .iter()
            .map(|archive_type| dir.join(archive_type.file_name(&self.id, &self.label)))
            .find(|path| path.is_file())
    }

    /// Pack `source` into this bundle's archive and return its path.
    ///
    /// Archives are immutable, so packing fails with `BundleExists` when
    /// an archive of any type is already stored for this id and version.
    pub fn pack(
        &mut self,
        source: &Path,
        observer: &dyn ProgressObserver,
    ) -> BundleResult<PathBuf> {
        if let Some(existing) = self.existing_archive() {
            return Err(ParcelError::BundleExists {
                bundle: format!("{} {}", self.id, self.label),
                path: existing,
            });
        }

        let archive = self.local_archive();
        pack_directory(source, &archive, self.archive_type, observer)?;

        self.hash = OnceLock::new();
        self.content_hash()?;

        tracing::info!("Packed {} {} into {}", self.id, self.label, archive.display());
        Ok(archive)
    }

    /// Extract this bundle's archive into `dest`
    pub fn extract(&self, dest: &Path, observer: &dyn ProgressObserver) -> BundleResult<()> {
        extract_archive(&self.local_archive(), dest, self.archive_type, observer)
    }

    /// SHA-1 of the archive, streamed in chunks and cached on first use
    pub fn content_hash(&self) -> BundleResult<String> {
        if let Some(hash) = self.hash.get() {
            return Ok(hash.clone());
        }

        let hash = sha1_file(&self.local_archive())?;
        Ok(self.hash.get_or_init(|| hash).clone())
    }

    /// Check the archive against an expected SHA-1
    pub fn verify(&self, expected: &str) -> BundleResult<()> {
        let actual = self.content_hash()?;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(ParcelError::IntegrityFailure {
                bundle: format!("{} {}", self.id, self.label),
                expected: expected.to_string(),
                actual,
            })
        }
    }

    /// The same bundle as it would live under another repository root.
    ///
    /// The cached hash carries over since the archive bytes are identical.
    pub fn relocate(&self, repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.id, self.label, self.archive_type)
    }
}
