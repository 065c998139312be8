//! HTTP client for remote repositories and published scripts

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::debug;
use url::Url;

use sprig_config::UserSettings;
use sprig_core::error::SprigError;
use sprig_core::types::{FileMap, PackageConfig, RepoRef};
use sprig_core::CONFIG_NAME;

use crate::api::{PublishedScript, RepoInfo};
use crate::cache::ManifestCache;
use crate::HostResult;

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

/// Authentication for repository access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
}

/// Base URLs of the remote services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Repository metadata API
    pub repo_api: String,
    /// Raw repository file host
    pub raw_content: String,
    /// Published script API
    pub script_api: String,
}

impl Endpoints {
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self {
            repo_api: settings.repo_api().to_string(),
            raw_content: settings.raw_content().to_string(),
            script_api: settings.script_api().to_string(),
        }
    }

    /// Every endpoint pointed at one base URL, handy for mock servers
    pub fn single(base: &str) -> Self {
        Self {
            repo_api: base.to_string(),
            raw_content: format!("{}/raw", base),
            script_api: format!("{}/scripts", base),
        }
    }

    fn validated(self) -> HostResult<Self> {
        for (field, value) in [
            ("repo_api", &self.repo_api),
            ("raw_content", &self.raw_content),
            ("script_api", &self.script_api),
        ] {
            Url::parse(value).map_err(|e| SprigError::ConfigValidation {
                field: field.to_string(),
                reason: format!("invalid URL '{}': {}", value, e),
            })?;
        }

        Ok(Self {
            repo_api: self.repo_api.trim_end_matches('/').to_string(),
            raw_content: self.raw_content.trim_end_matches('/').to_string(),
            script_api: self.script_api.trim_end_matches('/').to_string(),
        })
    }
}

/// Client for remote package repositories
#[derive(Debug, Clone)]
pub struct RepoClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    endpoints: Endpoints,
    cache: Arc<ManifestCache>,
}

impl RepoClient {
    /// Create a client from user settings
    pub fn from_settings(settings: &UserSettings) -> HostResult<Self> {
        let auth = AuthConfig {
            token: settings.remote.token.clone(),
        };
        Self::with_config(Endpoints::from_settings(settings), auth, RetryConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(
        endpoints: Endpoints,
        auth: AuthConfig,
        retry_config: RetryConfig,
    ) -> HostResult<Self> {
        let endpoints = endpoints.validated()?;

        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(Duration::from_secs(30))
            // Enable gzip compression
            .gzip(true)
            // User agent
            .user_agent(concat!("sprig/", env!("CARGO_PKG_VERSION")));

        if let Some(token) = auth.token {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token).parse().map_err(|e| SprigError::Network {
                    message: format!("Invalid auth token: {}", e),
                    source: Some(Box::new(e)),
                })?,
            );
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| SprigError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config,
            endpoints,
            cache: Arc::new(ManifestCache::new()),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> HostResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = HostResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    // Only transport failures are worth another attempt
                    let retryable = matches!(error, SprigError::Network { .. });
                    last_error = Some(error);

                    if !retryable || attempt == self.retry_config.max_retries {
                        break;
                    }

                    tokio::time::sleep(delay).await;

                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }

        Err(last_error.unwrap_or_else(|| SprigError::Network {
            message: "Retry operation failed without error".to_string(),
            source: None,
        }))
    }

    /// Whether the repository exists and is visible to us
    pub async fn repo_exists(&self, full_name: &str) -> HostResult<bool> {
        Ok(self.repo_info(full_name).await?.is_some())
    }

    /// Repository metadata, `None` if it does not exist
    pub async fn repo_info(&self, full_name: &str) -> HostResult<Option<RepoInfo>> {
        let url = format!("{}/repos/{}", self.endpoints.repo_api, full_name);
        let url = url.as_str();

        self.with_retry(|| async move {
            let response = self.get(url).await?;
            match response.status() {
                StatusCode::OK => {
                    let info = response.json::<RepoInfo>().await.map_err(|e| {
                        SprigError::network(format!("Failed to parse repository info: {}", e), e)
                    })?;
                    Ok(Some(info))
                },
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(SprigError::Network {
                    message: format!("Repository API returned status {}: {}", status, full_name),
                    source: None,
                }),
            }
        })
        .await
    }

    /// Manifest of a repository package, cached per reference
    pub async fn fetch_manifest(&self, repo: &RepoRef) -> HostResult<PackageConfig> {
        let key = repo.to_string();
        if let Some(config) = self.cache.get(&key) {
            debug!("manifest cache hit for {}", key);
            return Ok(config);
        }

        let text = self.fetch_manifest_text(repo).await?;
        let config = PackageConfig::parse(&key, &text)?;
        self.cache.insert(key, config.clone());
        Ok(config)
    }

    /// Manifest and every file it lists, including test files
    pub async fn download_repo(&self, repo: &RepoRef) -> HostResult<FileMap> {
        debug!("downloading repository {}", repo);

        let text = self.fetch_manifest_text(repo).await?;
        let config = PackageConfig::parse(&repo.to_string(), &text)?;

        let mut files = FileMap::new();
        files.insert(CONFIG_NAME.to_string(), text);

        for name in config.files.iter().chain(config.test_files.iter()) {
            if files.contains_key(name) {
                continue;
            }
            let contents = self.fetch_raw(repo, name).await?.ok_or_else(|| {
                SprigError::MissingFile {
                    file: format!("{}/{}", repo, name),
                }
            })?;
            files.insert(name.clone(), contents);
        }

        self.cache.insert(repo.to_string(), config);
        Ok(files)
    }

    /// Files of a published script
    pub async fn download_published(&self, script_id: &str) -> HostResult<FileMap> {
        debug!("downloading published script {}", script_id);
        let url = format!("{}/{}/text", self.endpoints.script_api, script_id);
        let url = url.as_str();

        self.with_retry(|| async move {
            let response = self.get(url).await?;
            match response.status() {
                StatusCode::OK => {
                    let script = response.json::<PublishedScript>().await.map_err(|e| {
                        SprigError::network(format!("Failed to parse script {}: {}", script_id, e), e)
                    })?;
                    Ok(script.files)
                },
                StatusCode::NOT_FOUND => Err(SprigError::PackageNotFound {
                    name: format!("pub:{}", script_id),
                }),
                status => Err(SprigError::Network {
                    message: format!("Script API returned status {}: {}", status, script_id),
                    source: None,
                }),
            }
        })
        .await
    }

    async fn fetch_manifest_text(&self, repo: &RepoRef) -> HostResult<String> {
        self.fetch_raw(repo, CONFIG_NAME)
            .await?
            .ok_or_else(|| SprigError::PackageNotFound {
                name: repo.to_string(),
            })
    }

    /// One raw file, `None` on 404
    async fn fetch_raw(&self, repo: &RepoRef, file: &str) -> HostResult<Option<String>> {
        let url = self.raw_url(repo, file);
        let url = url.as_str();

        self.with_retry(|| async move {
            let response = self.get(url).await?;
            match response.status() {
                StatusCode::OK => {
                    let text = response.text().await.map_err(|e| {
                        SprigError::network(format!("Failed to read {}: {}", url, e), e)
                    })?;
                    Ok(Some(text))
                },
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(SprigError::Network {
                    message: format!("Raw content host returned status {}: {}", status, url),
                    source: None,
                }),
            }
        })
        .await
    }

    fn raw_url(&self, repo: &RepoRef, file: &str) -> String {
        let tag = repo.tag.as_deref().unwrap_or("HEAD");
        match repo.path {
            Some(ref path) => format!(
                "{}/{}/{}/{}/{}/{}",
                self.endpoints.raw_content, repo.owner, repo.repo, tag, path, file
            ),
            None => format!(
                "{}/{}/{}/{}/{}",
                self.endpoints.raw_content, repo.owner, repo.repo, tag, file
            ),
        }
    }

    async fn get(&self, url: &str) -> HostResult<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| SprigError::network(format!("Failed to fetch {}: {}", url, e), e))
    }
}

#[cfg(test)]
mod tests;
