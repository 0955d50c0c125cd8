//! Source tree walking for packing.

use parcel_core::error::ParcelError;
use parcel_core::utils::archive_entry_name;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::BundleResult;

/// What a source entry is
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryKind {
    File,
    Dir,
    Symlink(PathBuf),
}

/// One entry to be written into an archive
#[derive(Debug, Clone)]
pub(crate) struct SourceEntry {
    pub path: PathBuf,
    /// `/`-separated path relative to the packing root
    pub name: String,
    pub kind: EntryKind,
    pub mode: u32,
}

/// Walk `source` depth-first in file-name order.
///
/// Directories are included so empty ones survive the round trip. Symlinks
/// are never followed; their targets are recorded as written.
pub(crate) fn collect_entries(source: &Path) -> BundleResult<Vec<SourceEntry>> {
    if !source.is_dir() {
        return Err(ParcelError::io(
            format!("Cannot pack {}", source.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "source is not a directory"),
        ));
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(source)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ParcelError::archive(source, e))?;
        let path = entry.path().to_path_buf();
        let relative = path
            .strip_prefix(source)
            .map_err(|e| ParcelError::archive(source, e))?;

        let metadata = fs::symlink_metadata(&path)
            .map_err(|e| ParcelError::io(format!("Failed to stat {}", path.display()), e))?;
        let file_type = metadata.file_type();

        let kind = if file_type.is_symlink() {
            let target = fs::read_link(&path)
                .map_err(|e| {
                    ParcelError::io(format!("Failed to read link {}", path.display()), e)
                })?;
            EntryKind::Symlink(target)
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            tracing::debug!("Skipping special file {}", path.display());
            continue;
        };

        entries.push(SourceEntry {
            name: archive_entry_name(relative),
            mode: mode_of(&metadata, &kind),
            kind,
            path,
        });
    }

    Ok(entries)
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata, _kind: &EntryKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &fs::Metadata, kind: &EntryKind) -> u32 {
    match kind {
        EntryKind::Dir | EntryKind::Symlink(_) => 0o755,
        EntryKind::File if metadata.permissions().readonly() => 0o444,
        EntryKind::File => 0o644,
    }
}
