//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset location and cache behavior
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Scraper behavior settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Token issuance settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.cache_ttl_secs == 0 {
            return Err(AppError::validation("catalog.cache_ttl_secs must be > 0"));
        }
        if self.catalog.dataset_file.trim().is_empty() {
            return Err(AppError::validation("catalog.dataset_file is empty"));
        }
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.max_pages == 0 || self.scraper.max_pages > 50 {
            return Err(AppError::validation("scraper.max_pages must be in 1..=50"));
        }
        if self.scraper.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        url::Url::parse(&self.scraper.base_url)
            .map_err(|e| AppError::validation(format!("scraper.base_url is invalid: {e}")))?;
        if self.auth.secret_key.trim().is_empty() {
            return Err(AppError::validation("auth.secret_key is empty"));
        }
        if self.auth.secret_key == defaults::secret_key() {
            tracing::warn!("auth.secret_key is the placeholder value; change it in production");
        }
        if self.auth.access_token_expire_mins <= 0 || self.auth.refresh_token_expire_days <= 0 {
            return Err(AppError::validation("auth token lifetimes must be > 0"));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Bind port
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Allowed CORS origins; "*" allows any origin
    #[serde(default = "defaults::allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            allowed_origins: defaults::allowed_origins(),
        }
    }
}

/// Dataset location and cache behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding the scraped dataset
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Dataset file name inside the data directory
    #[serde(default = "defaults::dataset_file")]
    pub dataset_file: String,

    /// Seconds a loaded snapshot stays fresh before a reload
    #[serde(default = "defaults::cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl CatalogConfig {
    /// Full path of the dataset file.
    pub fn dataset_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.dataset_file)
    }

    /// Snapshot time-to-live as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            dataset_file: defaults::dataset_file(),
            cache_ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Scraper behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Root URL of the scraped site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Listing pages to walk per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent detail-page requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            max_pages: defaults::max_pages(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Token issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for token signing
    #[serde(default = "defaults::secret_key")]
    pub secret_key: String,

    /// Access token lifetime in minutes
    #[serde(default = "defaults::access_expire")]
    pub access_token_expire_mins: i64,

    /// Refresh token lifetime in days
    #[serde(default = "defaults::refresh_expire")]
    pub refresh_token_expire_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: defaults::secret_key(),
            access_token_expire_mins: defaults::access_expire(),
            refresh_token_expire_days: defaults::refresh_expire(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        8000
    }
    pub fn allowed_origins() -> Vec<String> {
        vec!["*".into()]
    }

    // Catalog defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn dataset_file() -> String {
        "books.json".into()
    }
    pub fn cache_ttl() -> u64 {
        600
    }

    // Scraper defaults
    pub fn base_url() -> String {
        "https://books.toscrape.com/".into()
    }
    pub fn max_pages() -> usize {
        3
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bookcase/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Auth defaults
    pub fn secret_key() -> String {
        "change-this-secret-key-in-production".into()
    }
    pub fn access_expire() -> i64 {
        30
    }
    pub fn refresh_expire() -> i64 {
        7
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
