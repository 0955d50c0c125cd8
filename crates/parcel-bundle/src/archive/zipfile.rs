//! Zip encoding.
//!
//! Files are deflated. Directories are zero-length entries whose names end
//! in `/`. Symlinks are entries whose content is the link target and whose
//! external attributes carry the symlink file type.

use parcel_core::error::ParcelError;
use parcel_core::utils::extraction_target;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::walk::{EntryKind, SourceEntry};
use super::{create_entry_dir, create_entry_file, create_symlink, set_mode, PendingDirs};
use crate::progress::{checkpoint, copy_chunked, Action, ProgressObserver};
use crate::BundleResult;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

pub(crate) fn write<W: Write + Seek>(
    writer: W,
    archive: &Path,
    entries: &[SourceEntry],
    observer: &dyn ProgressObserver,
) -> BundleResult<W> {
    let zip_err = |e: zip::result::ZipError| ParcelError::archive(archive, e);
    let mut zip = ZipWriter::new(writer);

    for entry in entries {
        checkpoint(observer, Action::Compress)?;

        // Fixed timestamp keeps repeated packs byte-identical
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(entry.mode);

        match &entry.kind {
            EntryKind::Dir => {
                zip.add_directory(format!("{}/", entry.name), options)
                    .map_err(zip_err)?;
            }
            EntryKind::Symlink(target) => {
                zip.add_symlink(
                    entry.name.as_str(),
                    target.to_string_lossy().into_owned(),
                    options,
                )
                .map_err(zip_err)?;
            }
            EntryKind::File => {
                zip.start_file(entry.name.as_str(), options)
                    .map_err(zip_err)?;
                let mut source = File::open(&entry.path)
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to open {}", entry.path.display()), e)
                    })?;
                copy_chunked(&mut source, &mut zip, observer, Action::Compress, false)?;
            }
        }

        observer.advance(1);
    }

    zip.finish().map_err(zip_err)
}

fn open(archive: &Path) -> BundleResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive)
        .map_err(|e| ParcelError::io(format!("Failed to open {}", archive.display()), e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ParcelError::archive(archive, e))
}

pub(crate) fn entry_count(archive: &Path) -> BundleResult<u64> {
    Ok(open(archive)?.len() as u64)
}

pub(crate) fn extract(
    archive: &Path,
    dest: &Path,
    observer: &dyn ProgressObserver,
) -> BundleResult<()> {
    let mut zip = open(archive)?;
    let mut dirs = PendingDirs::default();

    for index in 0..zip.len() {
        checkpoint(observer, Action::Extract)?;

        let mut entry = zip
            .by_index(index)
            .map_err(|e| ParcelError::archive(archive, e))?;
        let name = entry.name().to_string();
        let target = extraction_target(dest, Path::new(name.trim_end_matches('/')))?;
        let mode = entry.unix_mode();

        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut link = String::new();
            entry
                .read_to_string(&mut link)
                .map_err(|e| ParcelError::io(format!("Failed to read link entry {}", name), e))?;
            create_symlink(Path::new(&link), &target)?;
        } else if entry.is_dir() {
            create_entry_dir(&target)?;
            dirs.push(target, mode);
        } else {
            let mut out = BufWriter::new(create_entry_file(&target)?);
            copy_chunked(&mut entry, &mut out, observer, Action::Extract, false)?;
            out.flush()
                .map_err(|e| ParcelError::io(format!("Failed to write {}", target.display()), e))?;
            set_mode(&target, mode)?;
        }

        observer.advance(1);
    }

    dirs.apply()
}

pub(crate) fn list(archive: &Path) -> BundleResult<Vec<String>> {
    let mut zip = open(archive)?;
    (0..zip.len())
        .map(|index| {
            zip.by_index(index)
                .map(|entry| entry.name().to_string())
                .map_err(|e| ParcelError::archive(archive, e))
        })
        .collect()
}
