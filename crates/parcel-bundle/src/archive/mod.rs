//! Archive packing and extraction
//!
//! Packing walks a directory in file-name order and writes every entry
//! (files, directories and symlinks) into a zip, tar.gz or tar.bz2
//! archive. Archives are written to a hidden partial file next to the
//! destination and renamed into place, so a finished archive never
//! changes after it appears.

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parcel_core::error::ParcelError;
use parcel_core::ArchiveType;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::progress::{Action, ProgressObserver};
use crate::BundleResult;

mod tarball;
mod walk;
mod zipfile;

/// Pack every entry under `source` into `archive`.
///
/// Returns the number of entries written. Fails with `EmptySource` when
/// `source` holds nothing.
pub fn pack_directory(
    source: &Path,
    archive: &Path,
    archive_type: ArchiveType,
    observer: &dyn ProgressObserver,
) -> BundleResult<u64> {
    let entries = walk::collect_entries(source)?;
    if entries.is_empty() {
        return Err(ParcelError::EmptySource {
            path: source.to_path_buf(),
        });
    }

    ensure_parent(archive)?;
    let partial = partial_path(archive);

    observer.start(&label(archive), Action::Compress, entries.len() as u64);

    if let Err(err) = write_archive(&partial, archive_type, &entries, observer) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    fs::rename(&partial, archive)
        .map_err(|e| {
            ParcelError::io(format!("Failed to move archive into {}", archive.display()), e)
        })?;

    observer.finish();
    tracing::debug!("Packed {} entries into {}", entries.len(), archive.display());

    Ok(entries.len() as u64)
}

fn write_archive(
    path: &Path,
    archive_type: ArchiveType,
    entries: &[walk::SourceEntry],
    observer: &dyn ProgressObserver,
) -> BundleResult<()> {
    let file = File::create(path)
        .map_err(|e| ParcelError::io(format!("Failed to create {}", path.display()), e))?;
    let writer = BufWriter::new(file);

    let finish_err = |e| ParcelError::io(format!("Failed to finish {}", path.display()), e);

    let mut writer = match archive_type {
        ArchiveType::Zip => zipfile::write(writer, path, entries, observer)?,
        ArchiveType::TarGz => {
            let encoder = GzEncoder::new(writer, Compression::default());
            tarball::write(encoder, path, entries, observer)?
                .finish()
                .map_err(finish_err)?
        }
        ArchiveType::TarBz2 => {
            let encoder = BzEncoder::new(writer, bzip2::Compression::default());
            tarball::write(encoder, path, entries, observer)?
                .finish()
                .map_err(finish_err)?
        }
    };

    writer.flush().map_err(finish_err)
}

/// Extract `archive` into `dest`, creating `dest` if needed.
///
/// Symlinks are recreated pointing at their stored target whether or not
/// the target exists. Directory permissions are restored last.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    archive_type: ArchiveType,
    observer: &dyn ProgressObserver,
) -> BundleResult<()> {
    if !archive.is_file() {
        return Err(ParcelError::ArchiveNotFound {
            path: archive.to_path_buf(),
        });
    }

    fs::create_dir_all(dest)
        .map_err(|e| ParcelError::io(format!("Failed to create {}", dest.display()), e))?;

    match archive_type {
        ArchiveType::Zip => {
            observer.start(&label(archive), Action::Extract, zipfile::entry_count(archive)?);
            zipfile::extract(archive, dest, observer)?;
        }
        ArchiveType::TarGz | ArchiveType::TarBz2 => {
            // Tar has no central directory, so the entry count is unknown
            observer.start(&label(archive), Action::Extract, 0);
            tarball::extract(open_tar(archive, archive_type)?, archive, dest, observer)?;
        }
    }

    observer.finish();
    Ok(())
}

/// List entry names in archive order. Directory names end with `/`.
pub fn list_entries(archive: &Path, archive_type: ArchiveType) -> BundleResult<Vec<String>> {
    if !archive.is_file() {
        return Err(ParcelError::ArchiveNotFound {
            path: archive.to_path_buf(),
        });
    }

    match archive_type {
        ArchiveType::Zip => zipfile::list(archive),
        ArchiveType::TarGz | ArchiveType::TarBz2 => {
            tarball::list(open_tar(archive, archive_type)?, archive)
        }
    }
}

fn open_tar(archive: &Path, archive_type: ArchiveType) -> BundleResult<Box<dyn Read>> {
    let file = File::open(archive)
        .map_err(|e| ParcelError::io(format!("Failed to open {}", archive.display()), e))?;
    let reader = BufReader::new(file);

    Ok(match archive_type {
        ArchiveType::TarBz2 => Box::new(BzDecoder::new(reader)),
        _ => Box::new(GzDecoder::new(reader)),
    })
}

fn partial_path(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    archive.with_file_name(format!(".{}.partial", name))
}

fn label(archive: &Path) -> String {
    archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

pub(crate) fn ensure_parent(path: &Path) -> BundleResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ParcelError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    Ok(())
}

/// Remove a symlink sitting where an entry is about to be written, so the
/// write never follows it
pub(crate) fn clear_symlink(path: &Path) -> BundleResult<()> {
    let is_symlink = fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false);

    if is_symlink {
        fs::remove_file(path)
            .map_err(|e| ParcelError::io(format!("Failed to replace {}", path.display()), e))?;
    }
    Ok(())
}

/// Create a directory entry, replacing a symlink left at `path`
pub(crate) fn create_entry_dir(path: &Path) -> BundleResult<()> {
    clear_symlink(path)?;
    fs::create_dir_all(path)
        .map_err(|e| ParcelError::io(format!("Failed to create {}", path.display()), e))
}

/// Create a file entry, replacing a symlink left at `path`
pub(crate) fn create_entry_file(path: &Path) -> BundleResult<File> {
    ensure_parent(path)?;
    clear_symlink(path)?;
    File::create(path)
        .map_err(|e| ParcelError::io(format!("Failed to create {}", path.display()), e))
}

/// Create `link` pointing at `target`, replacing whatever is at `link`
pub(crate) fn create_symlink(target: &Path, link: &Path) -> BundleResult<()> {
    ensure_parent(link)?;

    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link)
            .map_err(|e| ParcelError::io(format!("Failed to replace {}", link.display()), e))?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| ParcelError::io(format!("Failed to create symlink {}", link.display()), e))?;

    #[cfg(windows)]
    {
        let resolved = link.parent().map(|parent| parent.join(target));
        let created = if resolved.is_some_and(|path| path.is_dir()) {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };
        created.map_err(|e| {
            ParcelError::io(format!("Failed to create symlink {}", link.display()), e)
        })?;
    }

    Ok(())
}

pub(crate) fn set_mode(path: &Path, mode: Option<u32>) -> BundleResult<()> {
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| {
                ParcelError::io(format!("Failed to set permissions on {}", path.display()), e)
            })?;
    }

    #[cfg(not(unix))]
    let _ = (path, mode);

    Ok(())
}

/// Directory permissions waiting to be applied after extraction
#[derive(Default)]
pub(crate) struct PendingDirs(Vec<(PathBuf, u32)>);

impl PendingDirs {
    pub fn push(&mut self, path: PathBuf, mode: Option<u32>) {
        if let Some(mode) = mode {
            self.0.push((path, mode));
        }
    }

    /// Apply deepest directories first so a read-only parent never blocks
    /// a child
    pub fn apply(mut self) -> BundleResult<()> {
        self.0
            .sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        for (path, mode) in self.0 {
            set_mode(&path, Some(mode))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::progress::NoProgress;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn file_structure_strategy() -> impl Strategy<Value = HashMap<String, Vec<u8>>> {
        prop::collection::hash_map(
            "[a-zA-Z0-9_]{1,8}(/[a-zA-Z0-9_]{1,8}){0,2}\\.[a-z]{1,3}",
            prop::collection::vec(any::<u8>(), 0..2048),
            1..8,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]
        #[test]
        fn archive_round_trip(files in file_structure_strategy(), type_index in 0usize..3) {
            let archive_type = ArchiveType::ALL[type_index];
            let temp = tempdir().unwrap();
            let source = temp.path().join("source");
            let dest = temp.path().join("dest");

            for (file_path, content) in &files {
                let full_path = source.join(file_path);
                if let Some(parent) = full_path.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                // A generated file path may collide with a generated directory
                if full_path.is_dir() {
                    continue;
                }
                fs::write(&full_path, content).unwrap();
            }

            let archive = temp.path().join(archive_type.file_name("prop", "1.0.0"));
            pack_directory(&source, &archive, archive_type, &NoProgress).unwrap();
            extract_archive(&archive, &dest, archive_type, &NoProgress).unwrap();

            for (file_path, expected) in &files {
                let original = source.join(file_path);
                if !original.is_file() {
                    continue;
                }
                let actual = fs::read(dest.join(file_path)).unwrap();
                prop_assert_eq!(&actual, expected, "content mismatch for {}", file_path);
            }
        }
    }
}
