//! Archive formats a bundle can be packaged as.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParcelError;

/// Archive format of a bundle. Serialized as its file extension, the way
/// manifests record it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveType {
    #[default]
    #[serde(rename = ".zip")]
    Zip,
    #[serde(rename = ".tar.gz")]
    TarGz,
    #[serde(rename = ".tar.bz2")]
    TarBz2,
}

impl ArchiveType {
    pub const ALL: [ArchiveType; 3] = [ArchiveType::Zip, ArchiveType::TarGz, ArchiveType::TarBz2];

    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveType::Zip => ".zip",
            ArchiveType::TarGz => ".tar.gz",
            ArchiveType::TarBz2 => ".tar.bz2",
        }
    }

    /// Short name used on the command line and in configuration
    pub fn name(&self) -> &'static str {
        &self.extension()[1..]
    }

    /// Archive file name for a bundle: `<id>_<version><ext>`
    pub fn file_name(&self, id: &str, version: &str) -> String {
        format!("{}_{}{}", id, version, self.extension())
    }

    /// Detect the archive type from a file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|archive_type| lower.ends_with(archive_type.extension()))
    }
}

impl FromStr for ArchiveType {
    type Err = ParcelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveType::Zip),
            "tar.gz" | "tgz" => Ok(ArchiveType::TarGz),
            "tar.bz2" | "tbz2" | "tbz" => Ok(ArchiveType::TarBz2),
            other => Err(ParcelError::ConfigValidation {
                field: "archive type".to_string(),
                reason: format!("'{other}' is not one of zip, tar.gz, tar.bz2"),
            }),
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(ArchiveType::Zip.file_name("foo", "1.2.0"), "foo_1.2.0.zip");
        assert_eq!(ArchiveType::TarGz.file_name("foo", "1.2.0"), "foo_1.2.0.tar.gz");
        assert_eq!(ArchiveType::TarBz2.file_name("foo", "1.2.0"), "foo_1.2.0.tar.bz2");
    }

    #[test]
    fn test_detect_from_file_name() {
        assert_eq!(ArchiveType::from_file_name("foo_1.0.zip"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_file_name("foo_1.0.TAR.GZ"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_file_name("foo_1.0.tar.bz2"), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_file_name("foo_1.0.tar"), None);
        assert_eq!(ArchiveType::from_file_name("README"), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("zip".parse::<ArchiveType>().unwrap(), ArchiveType::Zip);
        assert_eq!(".tar.gz".parse::<ArchiveType>().unwrap(), ArchiveType::TarGz);
        assert_eq!("tgz".parse::<ArchiveType>().unwrap(), ArchiveType::TarGz);
        assert_eq!("tar.bz2".parse::<ArchiveType>().unwrap(), ArchiveType::TarBz2);
        assert!("rar".parse::<ArchiveType>().is_err());
        assert_eq!(ArchiveType::default(), ArchiveType::Zip);
    }

    #[test]
    fn test_serde_uses_extension() {
        let json = serde_json::to_string(&ArchiveType::TarBz2).unwrap();
        assert_eq!(json, "\".tar.bz2\"");
        let back: ArchiveType = serde_json::from_str("\".zip\"").unwrap();
        assert_eq!(back, ArchiveType::Zip);
    }
}
