//! Configuration types for media-dl
//!
//! The runtime surface recognized from the environment is deliberately small:
//!
//! | Variable              | Field                          | Default                 |
//! |-----------------------|--------------------------------|-------------------------|
//! | `RESOLVER_URL`        | `resolver.base_url`            | `http://localhost:9000` |
//! | `FILE_STORAGE_PATH`   | `storage.storage_dir`          | `./data`                |
//! | `FILE_EXPIRY_MINUTES` | `storage.retention`            | 30 minutes              |
//! | `PORT`                | `server.api.bind_address` port | 3000                    |
//!
//! Everything else has a default and can only be changed by embedding code.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable holding the resolver base URL
pub const ENV_RESOLVER_URL: &str = "RESOLVER_URL";
/// Environment variable holding the storage directory
pub const ENV_STORAGE_PATH: &str = "FILE_STORAGE_PATH";
/// Environment variable holding the retention window in minutes
pub const ENV_EXPIRY_MINUTES: &str = "FILE_EXPIRY_MINUTES";
/// Environment variable holding the listen port
pub const ENV_PORT: &str = "PORT";

/// Upstream resolver settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolverConfig {
    /// Internally-routable base URL of the resolver (default: "http://localhost:9000")
    #[serde(default = "default_resolver_url")]
    pub base_url: String,

    /// Externally-facing `host:port` the resolver advertises in tunnel URLs
    ///
    /// Tunnel URLs pointing at this address are rewritten to the host and port
    /// of `base_url` before they are dereferenced (default: "localhost:3001").
    /// `None` disables rewriting.
    #[serde(default = "default_public_address")]
    pub public_address: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_url(),
            public_address: default_public_address(),
        }
    }
}

/// Artifact storage and retention settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Directory holding one artifact per job (default: "./data")
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Artifacts older than this are removed by the sweeper (default: 30 minutes)
    #[serde(default = "default_retention", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub retention: Duration,

    /// Period between sweeper passes (default: 5 minutes)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Job execution settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Maximum jobs resolving or transferring at once (default: 8)
    ///
    /// Jobs beyond this bound stay `pending` until a slot frees up.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Percentage points added per estimator tick (default: 5)
    #[serde(default = "default_estimate_step")]
    pub estimate_step: u8,

    /// Interval between estimator ticks in milliseconds (default: 500)
    #[serde(default = "default_estimate_interval", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub estimate_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            estimate_step: default_estimate_step(),
            estimate_interval: default_estimate_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
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

/// Main configuration for MediaDownloader
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Upstream resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Artifact storage and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job execution settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Only the four recognized variables are consulted. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(url) = get(ENV_RESOLVER_URL) {
            config.resolver.base_url = url.trim().to_string();
        }

        if let Some(dir) = get(ENV_STORAGE_PATH) {
            config.storage.storage_dir = PathBuf::from(dir);
        }

        if let Some(minutes) = get(ENV_EXPIRY_MINUTES) {
            let minutes: u64 = minutes.trim().parse().map_err(|_| Error::Config {
                message: format!("expected a whole number of minutes, got '{}'", minutes),
                key: Some(ENV_EXPIRY_MINUTES.to_string()),
            })?;
            config.storage.retention = Duration::from_secs(minutes.saturating_mul(60));
        }

        if let Some(port) = get(ENV_PORT) {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("expected a port number, got '{}'", port),
                key: Some(ENV_PORT.to_string()),
            })?;
            config.server.api.bind_address.set_port(port);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.resolver.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::Config {
                    message: format!(
                        "resolver base URL '{}' is not an http(s) URL",
                        self.resolver.base_url
                    ),
                    key: Some("resolver.base_url".to_string()),
                });
            }
        }

        if self.storage.retention.is_zero() {
            return Err(Error::Config {
                message: "retention window must be greater than zero".to_string(),
                key: Some("storage.retention".to_string()),
            });
        }

        if self.storage.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep interval must be greater than zero".to_string(),
                key: Some("storage.sweep_interval".to_string()),
            });
        }

        if self.download.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("download.max_concurrent_jobs".to_string()),
            });
        }

        if self.download.estimate_step == 0 || self.download.estimate_interval.is_zero() {
            return Err(Error::Config {
                message: "estimator step and interval must be greater than zero".to_string(),
                key: Some("download.estimate_step".to_string()),
            });
        }

        Ok(())
    }
}

fn default_resolver_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_public_address() -> Option<String> {
    Some("localhost:3001".to_string())
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_retention() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_concurrent_jobs() -> usize {
    8
}

fn default_estimate_step() -> u8 {
    5
}

fn default_estimate_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
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

// Millisecond-resolution variant for sub-second knobs
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
