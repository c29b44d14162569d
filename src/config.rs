//! Configuration types for thread-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Upper bound on simultaneous fetch-and-write operations
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Download behavior configuration (directories, concurrency, write sizes)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root directory for thread folders (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Maximum simultaneous fetch-and-write operations, shared by all runs (1 to 8, default: 8)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Maximum bytes per incremental file write (default: 64 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of completed operations between progress updates (default: 10)
    #[serde(default = "default_progress_batch_size")]
    pub progress_batch_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            chunk_size: default_chunk_size(),
            progress_batch_size: default_progress_batch_size(),
        }
    }
}

/// Remote board settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceConfig {
    /// Site root prepended to every file path (default: "https://2ch.hk")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Board segment of the thread document URL (default: "b")
    #[serde(default = "default_board")]
    pub board: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request transport timeout in seconds (default: 60)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            board: default_board(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl SourceConfig {
    /// URL of the JSON document for a thread
    pub fn thread_url(&self, thread_id: &str) -> String {
        format!(
            "{}/{}/res/{}.json",
            self.base_url.trim_end_matches('/'),
            self.board,
            thread_id
        )
    }

    /// Absolute URL for a site-relative file path such as `/b/src/1/2.jpg`
    pub fn file_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8001)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for ThreadDownloader
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Remote board settings
    #[serde(default)]
    pub source: SourceConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make a run impossible
    pub fn validate(&self) -> Result<()> {
        let positive = [
            (
                "download.max_concurrent_fetches",
                self.download.max_concurrent_fetches,
            ),
            ("download.chunk_size", self.download.chunk_size),
            (
                "download.progress_batch_size",
                self.download.progress_batch_size,
            ),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::Config {
                    message: format!("{} must be at least 1", key),
                    key: Some(key.to_string()),
                });
            }
        }
        if self.download.max_concurrent_fetches > MAX_CONCURRENT_FETCHES {
            return Err(Error::Config {
                message: format!(
                    "download.max_concurrent_fetches must be at most {}, got {}",
                    MAX_CONCURRENT_FETCHES, self.download.max_concurrent_fetches
                ),
                key: Some("download.max_concurrent_fetches".to_string()),
            });
        }

        let parsed = url::Url::parse(&self.source.base_url).map_err(|e| Error::Config {
            message: format!("invalid base_url '{}': {}", self.source.base_url, e),
            key: Some("source.base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base_url must use http or https, got '{}'", parsed.scheme()),
                key: Some("source.base_url".to_string()),
            });
        }

        if self.source.board.is_empty() || self.source.board.contains('/') {
            return Err(Error::Config {
                message: format!("invalid board '{}'", self.source.board),
                key: Some("source.board".to_string()),
            });
        }

        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent_fetches() -> usize {
    MAX_CONCURRENT_FETCHES
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_progress_batch_size() -> usize {
    10
}

fn default_base_url() -> String {
    "https://2ch.hk".to_string()
}

fn default_board() -> String {
    "b".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8001))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
