//! Configuration types for webdl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Storage layout configuration (status records, payloads, archives)
///
/// Groups the on-disk directories the pipeline writes to.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Directory for per-job status records, logs, and transient rclone
    /// configs (default: "./status")
    #[serde(default = "default_status_dir")]
    pub status_dir: PathBuf,

    /// Directory holding one payload subdirectory per job (default: "./downloads")
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Directory archives are assembled in before upload (default: "./archives")
    #[serde(default = "default_archives_dir")]
    pub archives_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            status_dir: default_status_dir(),
            downloads_dir: default_downloads_dir(),
            archives_dir: default_archives_dir(),
        }
    }
}

/// External tool paths and execution limits
///
/// Explicit paths override PATH lookup; when unset the binaries are located
/// with `which` at pipeline time. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to gallery-dl executable (auto-detected if None)
    #[serde(default)]
    pub gallery_dl_path: Option<PathBuf>,

    /// Path to megadl executable (auto-detected if None)
    #[serde(default)]
    pub megadl_path: Option<PathBuf>,

    /// Path to rclone executable (auto-detected if None)
    #[serde(default)]
    pub rclone_path: Option<PathBuf>,

    /// Shell used for the compression pipeline (default: "/bin/sh")
    #[serde(default = "default_shell_path")]
    pub shell_path: PathBuf,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Kill a stage's tool if it runs longer than this many seconds
    /// (None = no limit)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub stage_timeout: Option<Duration>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gallery_dl_path: None,
            megadl_path: None,
            rclone_path: None,
            shell_path: default_shell_path(),
            search_path: true,
            stage_timeout: None,
        }
    }
}

/// Auto-proxy discovery configuration
///
/// Controls where candidate proxies come from and how they are probed.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProxyConfig {
    /// URL serving a newline-separated host:port proxy list
    #[serde(default = "default_proxy_list_url")]
    pub proxy_list_url: String,

    /// Number of candidates to sample from the list (default: 50)
    #[serde(default = "default_proxy_sample_size")]
    pub proxy_sample_size: usize,

    /// URL each candidate is probed against (default: "https://www.google.com")
    #[serde(default = "default_proxy_probe_url")]
    pub proxy_probe_url: String,

    /// Per-candidate probe timeout in seconds (default: 5)
    #[serde(default = "default_proxy_probe_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub proxy_probe_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_list_url: default_proxy_list_url(),
            proxy_sample_size: default_proxy_sample_size(),
            proxy_probe_url: default_proxy_probe_url(),
            proxy_probe_timeout: default_proxy_probe_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6789)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key; when set, requests must carry it in X-Api-Key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for the job manager
///
/// Fields are organized into logical sub-configs:
/// - [`storage`](StorageConfig) — on-disk layout
/// - [`tools`](ToolsConfig) — external binary paths and limits
/// - [`proxy`](ProxyConfig) — auto-proxy discovery
/// - [`api`](ApiConfig) — REST server
///
/// Sub-config fields are flattened so the JSON/TOML format stays flat
/// (no nesting), except the `api` block which is its own section.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// On-disk layout (status records, payloads, archives)
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// External tool paths and execution limits
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Auto-proxy discovery settings
    #[serde(flatten)]
    pub proxy: ProxyConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

// Convenience accessors for the most commonly used paths.
impl Config {
    /// Status directory
    pub fn status_dir(&self) -> &PathBuf {
        &self.storage.status_dir
    }

    /// Downloads directory
    pub fn downloads_dir(&self) -> &PathBuf {
        &self.storage.downloads_dir
    }

    /// Archives directory
    pub fn archives_dir(&self) -> &PathBuf {
        &self.storage.archives_dir
    }

    /// Validate settings that have no sensible fallback
    pub fn validate(&self) -> Result<()> {
        if self.proxy.proxy_sample_size == 0 {
            return Err(Error::config(
                "proxy_sample_size must be at least 1",
                "proxy_sample_size",
            ));
        }
        if self.proxy.proxy_probe_timeout.is_zero() {
            return Err(Error::config(
                "proxy_probe_timeout must be non-zero",
                "proxy_probe_timeout",
            ));
        }
        if let Some(timeout) = self.tools.stage_timeout {
            if timeout.is_zero() {
                return Err(Error::config(
                    "stage_timeout must be non-zero when set",
                    "stage_timeout",
                ));
            }
        }
        Ok(())
    }
}

fn default_status_dir() -> PathBuf {
    PathBuf::from("./status")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_archives_dir() -> PathBuf {
    PathBuf::from("./archives")
}

fn default_shell_path() -> PathBuf {
    PathBuf::from("/bin/sh")
}

fn default_true() -> bool {
    true
}

fn default_proxy_list_url() -> String {
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt".to_string()
}

fn default_proxy_sample_size() -> usize {
    50
}

fn default_proxy_probe_url() -> String {
    "https://www.google.com".to_string()
}

fn default_proxy_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6789))
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

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
