//! HTTP site with a JSON index.
//!
//! The site serves `<base>/parcel.json` and archives at
//! `<base>/<id>/<version>/<id>_<version><ext>`. The index is downloaded
//! once, on first use. Archives stream to a partial file while being
//! hashed, and only move into the destination repository once the SHA-1
//! matches the index. Publishing over HTTP is not supported.

use async_trait::async_trait;
use parcel_bundle::{Action, Bundle, LocalRepository, Manifest, ProgressObserver, MANIFEST_FILE};
use parcel_core::error::ParcelError;
use reqwest::{Client, ClientBuilder, StatusCode};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use url::Url;

use crate::query::Query;
use crate::resolution::{Locator, Resolution};
use crate::site::Site;
use crate::SiteResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Read-only site served over HTTP
#[derive(Debug)]
pub struct HttpSite {
    name: String,
    /// Always ends with `/` so relative joins stay under it
    base_url: Url,
    client: Client,
    retry_config: RetryConfig,
    index: OnceCell<Manifest>,
}

impl HttpSite {
    pub fn new(name: impl Into<String>, base_url: &str) -> SiteResult<Self> {
        Self::with_retry_config(name, base_url, RetryConfig::default())
    }

    pub fn with_retry_config(
        name: impl Into<String>,
        base_url: &str,
        retry_config: RetryConfig,
    ) -> SiteResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ParcelError::ConfigValidation {
            field: "sites.url".to_string(),
            reason: format!("'{}' is not a valid URL: {}", base_url, e),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("parcel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParcelError::network("Failed to create HTTP client", e))?;

        Ok(Self {
            name: name.into(),
            base_url,
            client,
            retry_config,
            index: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn join(&self, relative: &str) -> SiteResult<Url> {
        self.base_url
            .join(relative)
            .map_err(|e| ParcelError::ConfigValidation {
                field: "sites.url".to_string(),
                reason: format!("cannot build URL for '{}': {}", relative, e),
            })
    }

    pub fn index_url(&self) -> SiteResult<Url> {
        self.join(MANIFEST_FILE)
    }

    /// `<base>/<id>/<version>/<archive>`
    pub fn archive_url(&self, id: &str, version: &str, archive_name: &str) -> SiteResult<Url> {
        self.join(&format!("{}/{}/{}", id, version, archive_name))
    }

    /// Execute an operation with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> SiteResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = SiteResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    let retry = error.is_recoverable() && attempt < self.retry_config.max_retries;
                    last_error = Some(error);

                    if !retry {
                        break;
                    }

                    tracing::debug!("Request to {} failed, retrying in {:?}", self.name, delay);
                    tokio::time::sleep(delay).await;

                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ParcelError::Network {
            message: "Retry operation failed without error".to_string(),
            source: None,
        }))
    }

    async fn load_index(&self) -> SiteResult<Manifest> {
        let url = self.index_url()?;
        let client = &self.client;
        let name = self.name.as_str();
        let url_ref = &url;

        self.with_retry(|| async move {
            let response = client
                .get(url_ref.clone())
                .send()
                .await
                .map_err(|e| ParcelError::network(format!("Failed to fetch {}", url_ref), e))?;

            match response.status() {
                StatusCode::OK => {
                    let text = response
                        .text()
                        .await
                        .map_err(|e| {
                            ParcelError::network(format!("Failed to read {}", url_ref), e)
                        })?;
                    Manifest::parse(&text, url_ref.as_str())
                }
                StatusCode::NOT_FOUND => {
                    tracing::warn!(
                        "Site {} has no index at {}; treating it as empty",
                        name,
                        url_ref
                    );
                    Ok(Manifest::default())
                }
                status => Err(ParcelError::Network {
                    message: format!("{} returned status {}", url_ref, status),
                    source: None,
                }),
            }
        })
        .await
    }

    /// The site index, downloaded on first use
    pub async fn cached_index(&self) -> SiteResult<&Manifest> {
        self.index.get_or_try_init(|| self.load_index()).await
    }

    async fn download(
        &self,
        url: &Url,
        partial: &Path,
        label: &str,
        expected: Option<&str>,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<()> {
        let client = &self.client;

        self.with_retry(|| async move {
            let mut response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| ParcelError::network(format!("Failed to download {}", url), e))?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::NOT_FOUND => {
                    return Err(ParcelError::ArchiveNotFound {
                        path: PathBuf::from(url.as_str()),
                    })
                }
                status => {
                    return Err(ParcelError::Network {
                        message: format!("{} returned status {}", url, status),
                        source: None,
                    })
                }
            }

            observer.start(label, Action::Download, response.content_length().unwrap_or(0));

            let mut file = tokio::fs::File::create(partial)
                .await
                .map_err(|e| {
                    ParcelError::io(format!("Failed to create {}", partial.display()), e)
                })?;
            let mut hasher = Sha1::new();

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ParcelError::network(format!("Failed to download {}", url), e))?
            {
                if observer.is_cancelled() {
                    return Err(ParcelError::Cancelled {
                        operation: Action::Download.verb().to_string(),
                    });
                }
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| {
                        ParcelError::io(format!("Failed to write {}", partial.display()), e)
                    })?;
                observer.advance(chunk.len() as u64);
            }

            file.flush()
                .await
                .map_err(|e| ParcelError::io(format!("Failed to write {}", partial.display()), e))?;

            let actual = hex::encode(hasher.finalize());
            if let Some(expected) = expected {
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(ParcelError::IntegrityFailure {
                        bundle: label.to_string(),
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }

            observer.finish();
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Site for HttpSite {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, query: &Query) -> SiteResult<Vec<Resolution>> {
        let index = self.cached_index().await?;
        let mut resolutions = Vec::new();

        for entry in index.versions(&query.id) {
            if !query.matches_version(&entry.version) {
                continue;
            }
            let parsed = Bundle::new(&query.id, &entry.version, entry.archive_type, PathBuf::new());
            let bundle = match parsed {
                Ok(bundle) => bundle,
                Err(err) => {
                    tracing::warn!("Skipping index entry {} {}: {}", query.id, entry.version, err);
                    continue;
                }
            };
            let url = self.archive_url(&query.id, &entry.version, &entry.archive_name())?;
            resolutions.push(Resolution::new(bundle, Locator::url(url.to_string())));
        }

        Ok(resolutions)
    }

    async fn fetch(
        &self,
        resolution: &Resolution,
        destination: &LocalRepository,
        observer: &dyn ProgressObserver,
    ) -> SiteResult<Bundle> {
        let source = resolution.bundle();
        let bundle =
            destination.bundle(source.id(), source.version_label(), source.archive_type())?;
        if let Some(existing) = bundle.existing_archive() {
            return Err(ParcelError::BundleExists {
                bundle: format!("{} {}", bundle.id(), bundle.version_label()),
                path: existing,
            });
        }
        let archive_name = bundle.archive_name();

        let url = match &resolution.locator().url {
            Some(url) => Url::parse(url).map_err(|e| ParcelError::archive(url.as_str(), e))?,
            None => self.archive_url(bundle.id(), bundle.version_label(), &archive_name)?,
        };

        let expected = self
            .cached_index()
            .await?
            .get(bundle.id(), bundle.version_label())
            .map(|entry| entry.sha1.clone());

        let dir = bundle.local_path();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ParcelError::io(format!("Failed to create {}", dir.display()), e))?;

        let partial = dir.join(format!(".{}.download", archive_name));
        if let Err(err) = self
            .download(&url, &partial, &archive_name, expected.as_deref(), observer)
            .await
        {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }

        tokio::fs::rename(&partial, bundle.local_archive())
            .await
            .map_err(|e| {
                ParcelError::io(format!("Failed to move archive into {}", dir.display()), e)
            })?;
        destination.invalidate(bundle.id());

        tracing::info!("Downloaded {} from {}", bundle, url);
        Ok(bundle)
    }

    async fn publish(&self, _bundle: &Bundle, _observer: &dyn ProgressObserver) -> SiteResult<()> {
        Err(ParcelError::PublishUnsupported {
            site: self.name.clone(),
        })
    }

    async fn index(&self) -> SiteResult<Manifest> {
        self.cached_index().await.cloned()
    }
}
