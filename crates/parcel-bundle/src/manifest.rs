//! Repository manifest.
//!
//! A manifest is the JSON index a repository or site keeps at its root:
//!
//! ```json
//! {
//!     "bundles": {
//!         "foo": {
//!             "1.2.0": {
//!                 "id": "foo",
//!                 "sha1": "<40 hex>",
//!                 "type": ".zip",
//!                 "version": "1.2.0"
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Keys are sorted and indentation is fixed at four spaces so that diffs
//! between revisions stay small.

use parcel_core::error::ParcelError;
use parcel_core::ArchiveType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::bundle::Bundle;
use crate::BundleResult;

/// File name of the manifest at the root of a repository or site
pub const MANIFEST_FILE: &str = "parcel.json";

/// Metadata recorded for one published bundle.
///
/// Fields are declared in alphabetical order so serialized keys are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub sha1: String,
    #[serde(rename = "type")]
    pub archive_type: ArchiveType,
    pub version: String,
}

impl ManifestEntry {
    /// Archive file name for this entry
    pub fn archive_name(&self) -> String {
        self.archive_type.file_name(&self.id, &self.version)
    }
}

/// Index of bundles keyed by identifier, then version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    bundles: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest file. A missing file is an empty manifest.
    pub fn load(path: &Path) -> BundleResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, &path.display().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(ParcelError::io(format!("Failed to read manifest {}", path.display()), e))
            }
        }
    }

    /// Parse manifest JSON; `location` names the source in errors
    pub fn parse(text: &str, location: &str) -> BundleResult<Self> {
        serde_json::from_str(text).map_err(|e| ParcelError::ManifestParse {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    /// Render with sorted keys and four-space indentation
    pub fn to_json_string(&self) -> BundleResult<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| ParcelError::ManifestParse {
                location: MANIFEST_FILE.to_string(),
                message: e.to_string(),
            })?;

        let text = String::from_utf8_lossy(&buffer);
        let mut rendered = text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        rendered.push('\n');
        Ok(rendered)
    }

    /// Write the manifest atomically: a sibling temp file renamed over `path`
    pub fn save(&self, path: &Path) -> BundleResult<()> {
        let text = self.to_json_string()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ParcelError::io(format!("Failed to create {}", parent.display()), e))?;
        }

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, text)
            .map_err(|e| ParcelError::io(format!("Failed to write {}", temp.display()), e))?;
        fs::rename(&temp, path)
            .map_err(|e| {
                ParcelError::io(format!("Failed to replace manifest {}", path.display()), e)
            })
    }

    /// Record a bundle, hashing its archive if needed
    pub fn add(&mut self, bundle: &Bundle) -> BundleResult<()> {
        self.insert(ManifestEntry {
            id: bundle.id().to_string(),
            sha1: bundle.content_hash()?,
            archive_type: bundle.archive_type(),
            version: bundle.version_label().to_string(),
        });
        Ok(())
    }

    pub fn insert(&mut self, entry: ManifestEntry) {
        self.bundles
            .entry(entry.id.clone())
            .or_default()
            .insert(entry.version.clone(), entry);
    }

    pub fn remove(&mut self, id: &str, version: &str) -> Option<ManifestEntry> {
        let versions = self.bundles.get_mut(id)?;
        let removed = versions.remove(version);
        if versions.is_empty() {
            self.bundles.remove(id);
        }
        removed
    }

    pub fn get(&self, id: &str, version: &str) -> Option<&ManifestEntry> {
        self.bundles.get(id)?.get(version)
    }

    /// Versions recorded for `id`, in key order
    pub fn versions(&self, id: &str) -> impl Iterator<Item = &ManifestEntry> {
        self.bundles.get(id).into_iter().flat_map(|versions| versions.values())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bundles.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
