//! Path utilities for archive entries.
//!
//! Entry names come from untrusted archives, so every name is checked
//! before it is joined onto an extraction root.

use crate::error::{ParcelError, ParcelResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Validate an archive entry path and return it as a clean relative path.
///
/// Rejects absolute paths, drive prefixes and any `..` component. `.`
/// components are dropped.
pub fn sanitize_entry(entry: &Path) -> ParcelResult<PathBuf> {
    let mut clean = PathBuf::new();

    for component in entry.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ParcelError::UnsafePath {
                    entry: entry.display().to_string(),
                });
            }
        }
    }

    Ok(clean)
}

/// Join an archive entry onto `base`, refusing entries that escape it
pub fn safe_join(base: &Path, entry: &Path) -> ParcelResult<PathBuf> {
    Ok(base.join(sanitize_entry(entry)?))
}

/// Join an archive entry onto `base` for writing.
///
/// Besides the checks of [`safe_join`], every directory between `base` and
/// the entry must not be a symlink. The final component is left to the
/// caller.
pub fn extraction_target(base: &Path, entry: &Path) -> ParcelResult<PathBuf> {
    let relative = sanitize_entry(entry)?;
    let mut current = base.to_path_buf();
    let mut components = relative.components().peekable();

    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(ParcelError::UnsafePath {
                    entry: entry.display().to_string(),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => break,
            Err(e) => {
                return Err(ParcelError::io(
                    format!("Failed to inspect {}", current.display()),
                    e,
                ))
            }
        }
    }

    Ok(base.join(relative))
}

/// Check that an identifier or version label is usable as one directory
/// name: non-empty, no separators and not `.` or `..`.
pub fn check_path_segment(value: &str) -> ParcelResult<()> {
    let unsafe_segment = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
        || Path::new(value).is_absolute();

    if unsafe_segment {
        return Err(ParcelError::UnsafePath {
            entry: value.to_string(),
        });
    }
    Ok(())
}

/// Archive entry name for a path relative to the packing root.
///
/// Entry names always use `/` regardless of platform.
pub fn archive_entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
