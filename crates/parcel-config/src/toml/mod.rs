//! parcel.toml parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use parcel_core::error::ParcelError;
use parcel_core::ArchiveType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

use crate::ConfigResult;

/// Complete parcel.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelToml {
    /// Local repository section
    #[serde(default)]
    pub repository: RepositorySection,

    /// Remote sites, consulted in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<SiteSection>,
}

/// Local repository settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySection {
    /// Repository root; `~/` expands to the home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,

    /// Archive type used by `pack` and `publish` when none is given
    #[serde(rename = "default-archive", skip_serializing_if = "Option::is_none")]
    pub default_archive: Option<String>,
}

/// Transport backing a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Filesystem,
    Http,
}

/// One `[[sites]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSection {
    pub name: String,
    pub kind: SiteKind,

    /// Directory of a filesystem site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,

    /// Base URL of an HTTP site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Retry attempts for HTTP requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl ParcelToml {
    /// Archive type for new bundles, `zip` when unset
    pub fn default_archive(&self) -> ConfigResult<ArchiveType> {
        match &self.repository.default_archive {
            Some(name) => name.parse().map_err(|_| ParcelError::ConfigValidation {
                field: "repository.default-archive".to_string(),
                reason: format!("'{}' is not one of zip, tar.gz, tar.bz2", name),
            }),
            None => Ok(ArchiveType::default()),
        }
    }

    /// Repository root with `~/` expanded, if one is configured
    pub fn repository_path(&self, home: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
        self.repository
            .path
            .as_deref()
            .map(|path| expand_home(path, home))
    }

    pub fn site(&self, name: &str) -> Option<&SiteSection> {
        self.sites.iter().find(|site| site.name == name)
    }
}

/// Expand a leading `~` against `home`
pub fn expand_home(path: &Utf8Path, home: Option<&Utf8Path>) -> Utf8PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Parse TOML text into a validated [`ParcelToml`].
///
/// `file` names the source in error messages.
pub fn parse_parcel_toml(content: &str, file: &str) -> ConfigResult<ParcelToml> {
    // toml_edit first for precise syntax errors
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, file, e.message(), e.span()))?;

    let config: ParcelToml = ::toml::from_str(content)
        .map_err(|e| toml_error(content, file, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize configuration back to TOML
pub fn serialize_parcel_toml(config: &ParcelToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| ParcelError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &ParcelToml) -> ConfigResult<()> {
    config.default_archive()?;

    let mut names = HashSet::new();
    for site in &config.sites {
        if site.name.trim().is_empty() {
            return Err(ParcelError::ConfigValidation {
                field: "sites.name".to_string(),
                reason: "every site needs a name".to_string(),
            });
        }

        if !names.insert(site.name.as_str()) {
            return Err(ParcelError::ConfigValidation {
                field: "sites.name".to_string(),
                reason: format!("site '{}' is defined more than once", site.name),
            });
        }

        match site.kind {
            SiteKind::Filesystem if site.path.is_none() => {
                return Err(ParcelError::ConfigValidation {
                    field: format!("sites.{}.path", site.name),
                    reason: "filesystem sites need a path".to_string(),
                });
            }
            SiteKind::Http if site.url.is_none() => {
                return Err(ParcelError::ConfigValidation {
                    field: format!("sites.{}.url", site.name),
                    reason: "http sites need a url".to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(())
}

/// Load and parse parcel.toml from a file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<ParcelToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParcelError::io(format!("Failed to read {}", path), e))?;

    parse_parcel_toml(&content, path.as_str())
}

fn toml_error(content: &str, file: &str, message: &str, span: Option<Range<usize>>) -> ParcelError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((1, 1));

    ParcelError::TomlParse {
        file: file.to_string(),
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|newline| before[newline + 1..].chars().count())
        .unwrap_or_else(|| before.chars().count())
        + 1;
    (line, column)
}
