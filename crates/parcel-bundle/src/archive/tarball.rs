//! Tar encoding, shared by the gzip and bzip2 archive types.
//!
//! Tar stores directories and symlinks natively, so the only work here is
//! path validation and deferring directory permissions.

use parcel_core::error::ParcelError;
use parcel_core::utils::extraction_target;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tar::{Archive, Builder, EntryType, Header, HeaderMode};

use super::walk::{EntryKind, SourceEntry};
use super::{
    clear_symlink, create_entry_dir, create_entry_file, create_symlink, ensure_parent, set_mode,
    PendingDirs,
};
use crate::progress::{
    cancelled_or, checkpoint, copy_chunked, Action, CheckedReader, ProgressObserver,
};
use crate::BundleResult;

pub(crate) fn write<W: Write>(
    writer: W,
    archive: &Path,
    entries: &[SourceEntry],
    observer: &dyn ProgressObserver,
) -> BundleResult<W> {
    let mut builder = Builder::new(writer);
    builder.mode(HeaderMode::Complete);
    builder.follow_symlinks(false);

    for entry in entries {
        checkpoint(observer, Action::Compress)?;

        let appended = match &entry.kind {
            EntryKind::Dir | EntryKind::Symlink(_) => {
                builder.append_path_with_name(&entry.path, &entry.name)
            }
            EntryKind::File => {
                let file = File::open(&entry.path)
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to open {}", entry.path.display()), e)
                    })?;
                let metadata = file
                    .metadata()
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to stat {}", entry.path.display()), e)
                    })?;
                let mut header = Header::new_gnu();
                header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
                builder.append_data(&mut header, &entry.name, CheckedReader::new(file, observer))
            }
        };

        appended.map_err(|e| {
            cancelled_or(
                observer,
                Action::Compress,
                ParcelError::io(
                    format!("Failed to add {} to {}", entry.name, archive.display()),
                    e,
                ),
            )
        })?;

        observer.advance(1);
    }

    builder
        .into_inner()
        .map_err(|e| ParcelError::io(format!("Failed to finish {}", archive.display()), e))
}

pub(crate) fn extract<R: Read>(
    reader: R,
    archive: &Path,
    dest: &Path,
    observer: &dyn ProgressObserver,
) -> BundleResult<()> {
    let mut tar = Archive::new(reader);
    let mut dirs = PendingDirs::default();

    let entries = tar
        .entries()
        .map_err(|e| ParcelError::archive(archive, e))?;

    for entry in entries {
        checkpoint(observer, Action::Extract)?;

        let mut entry = entry.map_err(|e| ParcelError::archive(archive, e))?;
        let path = entry
            .path()
            .map_err(|e| ParcelError::archive(archive, e))?
            .into_owned();
        let target = extraction_target(dest, &path)?;
        let mode = entry.header().mode().ok();

        match entry.header().entry_type() {
            EntryType::Directory => {
                create_entry_dir(&target)?;
                dirs.push(target, mode);
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|e| ParcelError::archive(archive, e))?
                    .ok_or_else(|| {
                        let message = format!("symlink {} has no target", path.display());
                        ParcelError::archive(archive, message)
                    })?
                    .into_owned();
                create_symlink(&link, &target)?;
            }
            EntryType::Link => {
                let link = entry
                    .link_name()
                    .map_err(|e| ParcelError::archive(archive, e))?
                    .ok_or_else(|| {
                        let message = format!("hard link {} has no target", path.display());
                        ParcelError::archive(archive, message)
                    })?
                    .into_owned();
                let source = extraction_target(dest, &link)?;
                if fs::symlink_metadata(&source).is_ok_and(|m| m.file_type().is_symlink()) {
                    return Err(ParcelError::UnsafePath {
                        entry: link.display().to_string(),
                    });
                }
                ensure_parent(&target)?;
                clear_symlink(&target)?;
                fs::copy(&source, &target)
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to link {}", target.display()), e)
                    })?;
            }
            kind if kind.is_file() || kind == EntryType::Continuous => {
                let mut out = BufWriter::new(create_entry_file(&target)?);
                copy_chunked(&mut entry, &mut out, observer, Action::Extract, false)?;
                out.flush()
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to write {}", target.display()), e)
                    })?;
                set_mode(&target, mode)?;
            }
            other => {
                tracing::debug!("Skipping {:?} entry {}", other, path.display());
                continue;
            }
        }

        observer.advance(1);
    }

    dirs.apply()
}

pub(crate) fn list<R: Read>(reader: R, archive: &Path) -> BundleResult<Vec<String>> {
    let mut tar = Archive::new(reader);
    let mut names = Vec::new();

    for entry in tar.entries().map_err(|e| ParcelError::archive(archive, e))? {
        let entry = entry.map_err(|e| ParcelError::archive(archive, e))?;
        let path = entry.path().map_err(|e| ParcelError::archive(archive, e))?;
        let mut name = path.to_string_lossy().trim_end_matches('/').to_string();
        if entry.header().entry_type().is_dir() {
            name.push('/');
        }
        names.push(name);
    }

    Ok(names)
}
