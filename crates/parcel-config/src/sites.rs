//! Build configured sites.

use parcel_core::error::ParcelError;
use parcel_site::{FilesystemSite, HttpSite, RetryConfig, Site};
use std::sync::Arc;
use tracing::debug;

use crate::toml::{ParcelToml, SiteKind, SiteSection};
use crate::ConfigResult;

/// Instantiate every `[[sites]]` entry, in file order
pub fn build_sites(config: &ParcelToml) -> ConfigResult<Vec<Arc<dyn Site>>> {
    config.sites.iter().map(build_site).collect()
}

fn build_site(section: &SiteSection) -> ConfigResult<Arc<dyn Site>> {
    debug!("Configuring {:?} site {}", section.kind, section.name);

    match section.kind {
        SiteKind::Filesystem => {
            let path = section
                .path
                .as_ref()
                .ok_or_else(|| missing(section, "path"))?;
            Ok(Arc::new(FilesystemSite::open(&section.name, path.as_std_path())?))
        }
        SiteKind::Http => {
            let url = section.url.as_deref().ok_or_else(|| missing(section, "url"))?;
            let mut retry_config = RetryConfig::default();
            if let Some(retries) = section.retries {
                retry_config.max_retries = retries;
            }
            Ok(Arc::new(HttpSite::with_retry_config(&section.name, url, retry_config)?))
        }
    }
}

fn missing(section: &SiteSection, field: &str) -> ParcelError {
    ParcelError::ConfigValidation {
        field: format!("sites.{}.{}", section.name, field),
        reason: format!("{:?} sites need a {}", section.kind, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toml::parse_parcel_toml;
    use tempfile::TempDir;

    #[test]
    fn test_build_sites_in_order() {
        let temp = TempDir::new().unwrap();
        let share = temp.path().join("share");
        let toml = format!(
            r#"
[[sites]]
name = "mirror"
kind = "http"
url = "http://127.0.0.1:9/parcel"

[[sites]]
name = "shared"
kind = "filesystem"
path = "{}"
"#,
            share.display().to_string().replace('\\', "/")
        );
        let config = parse_parcel_toml(&toml, "parcel.toml").unwrap();

        let sites = build_sites(&config).unwrap();
        let names: Vec<_> = sites.iter().map(|site| site.name()).collect();
        assert_eq!(names, ["mirror", "shared"]);
        // The share is created by the first publish, not by configuration
        assert!(!share.exists());
    }

    #[test]
    fn test_unreachable_share_keeps_other_sites() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let unreachable = blocker.join("mnt");

        let toml = format!(
            r#"
[[sites]]
name = "offline"
kind = "filesystem"
path = "{}"

[[sites]]
name = "mirror"
kind = "http"
url = "http://127.0.0.1:9/parcel"
"#,
            unreachable.display().to_string().replace('\\', "/")
        );
        let config = parse_parcel_toml(&toml, "parcel.toml").unwrap();

        let sites = build_sites(&config).unwrap();
        let names: Vec<_> = sites.iter().map(|site| site.name()).collect();
        assert_eq!(names, ["offline", "mirror"]);
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let config = ParcelToml {
            sites: vec![SiteSection {
                name: "broken".to_string(),
                kind: SiteKind::Http,
                path: None,
                url: Some("not a url".to_string()),
                retries: None,
            }],
            ..ParcelToml::default()
        };

        assert!(matches!(
            build_sites(&config),
            Err(ParcelError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_no_sites() {
        assert!(build_sites(&ParcelToml::default()).unwrap().is_empty());
    }
}
