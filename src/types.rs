//! Core types for webdl

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a job
///
/// A UUID v4 rendered as a string. The id doubles as the file stem for the
/// job's status record, log transcript, and transient rclone config.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random job id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// External tool used to fetch the source URL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DownloaderKind {
    /// gallery-dl, the general-purpose media downloader (default)
    #[default]
    GalleryDl,
    /// megadl (megatools), for mega.nz links
    Megadl,
}

impl DownloaderKind {
    /// Name of the executable on PATH
    pub fn binary_name(&self) -> &'static str {
        match self {
            DownloaderKind::GalleryDl => "gallery-dl",
            DownloaderKind::Megadl => "megadl",
        }
    }
}

/// Remote storage backend, with credentials captured at submission
///
/// Each variant maps to one rclone remote type. Credentials live only in the
/// per-job transient config file and are deleted with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum UploadBackend {
    /// Microsoft OneDrive
    Onedrive {
        /// OAuth token JSON blob as rclone expects it
        token: String,
        /// Drive identifier
        drive_id: String,
        /// Drive type (personal, business, documentLibrary)
        drive_type: String,
    },
    /// Google Drive
    Googledrive {
        /// OAuth token JSON blob
        token: String,
        /// Shared-drive id, empty for My Drive
        #[serde(default)]
        team_drive: String,
    },
    /// Any WebDAV server (alist, nextcloud, ...)
    Webdav {
        /// Endpoint URL
        url: String,
        /// Username
        user: String,
        /// Password (plaintext; rclone obscures on its own config path,
        /// the transient file uses the `pass` key verbatim)
        pass: String,
    },
}

impl UploadBackend {
    /// The rclone remote type this backend renders to
    pub fn remote_type(&self) -> &'static str {
        match self {
            UploadBackend::Onedrive { .. } => "onedrive",
            UploadBackend::Googledrive { .. } => "drive",
            UploadBackend::Webdav { .. } => "webdav",
        }
    }

    /// Wire name accepted in the `upload_service` request field
    pub fn service_name(&self) -> &'static str {
        match self {
            UploadBackend::Onedrive { .. } => "onedrive",
            UploadBackend::Googledrive { .. } => "googledrive",
            UploadBackend::Webdav { .. } => "webdav",
        }
    }
}

/// Compression stage options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompressionOptions {
    /// Whether to pack the download into a tar.zst archive before upload
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Split the archive into fixed-size parts
    #[serde(default)]
    pub split: bool,
    /// Part size in megabytes when splitting
    #[serde(default = "default_split_size_mb")]
    pub split_size_mb: u32,
}

fn default_true() -> bool {
    true
}

fn default_split_size_mb() -> u32 {
    1000
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            split: false,
            split_size_mb: default_split_size_mb(),
        }
    }
}

/// How the download stage acquires a proxy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum ProxyMode {
    /// Direct connection (default)
    #[default]
    None,
    /// Caller-supplied proxy URL, used as-is
    Manual(String),
    /// Probe a public proxy list and use the first responsive candidate
    Auto,
}

/// Immutable description of a job, captured and validated at submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSpec {
    /// Job id, also the file stem for all per-job artifacts
    pub id: JobId,
    /// Source URL to fetch
    #[schema(value_type = String)]
    pub url: Url,
    /// Fetch tool
    #[serde(default)]
    pub downloader: DownloaderKind,
    /// Upload destination and credentials
    pub backend: UploadBackend,
    /// Destination path on the remote
    pub upload_path: String,
    /// Compression stage options
    #[serde(default)]
    pub compression: CompressionOptions,
    /// Proxy acquisition mode for the download stage
    #[serde(default)]
    pub proxy: ProxyMode,
    /// Optional download rate limit, passed through to the tool
    /// (e.g., "500k" for gallery-dl, "500K" for megadl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<String>,
}

impl JobSpec {
    /// Build a validated spec from the flat wire request, minting a fresh id.
    ///
    /// Returns a `Config` error naming the offending field when the request
    /// is incomplete or names an unsupported service.
    pub fn from_request(req: JobRequest) -> Result<Self> {
        let url = Url::parse(&req.url)
            .map_err(|e| Error::config(format!("invalid url: {e}"), "url"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("unsupported url scheme: {}", url.scheme()),
                "url",
            ));
        }

        let backend = match req.upload_service.as_str() {
            "onedrive" => UploadBackend::Onedrive {
                token: required(req.token, "token")?,
                drive_id: required(req.drive_id, "drive_id")?,
                drive_type: req.drive_type.unwrap_or_else(|| "personal".to_string()),
            },
            "googledrive" => UploadBackend::Googledrive {
                token: required(req.token, "token")?,
                team_drive: req.team_drive.unwrap_or_default(),
            },
            "webdav" => UploadBackend::Webdav {
                url: required(req.webdav_url, "webdav_url")?,
                user: required(req.webdav_user, "webdav_user")?,
                pass: required(req.webdav_pass, "webdav_pass")?,
            },
            other => {
                return Err(Error::config(
                    format!("unsupported upload service: {other}"),
                    "upload_service",
                ));
            }
        };

        let upload_path = req.upload_path.trim().to_string();
        if upload_path.is_empty() {
            return Err(Error::config("upload_path must not be empty", "upload_path"));
        }

        let proxy = match (req.proxy, req.auto_proxy.unwrap_or(false)) {
            (Some(p), _) if !p.trim().is_empty() => ProxyMode::Manual(p),
            (_, true) => ProxyMode::Auto,
            _ => ProxyMode::None,
        };

        Ok(Self {
            id: JobId::new(),
            url,
            downloader: req.downloader.unwrap_or_default(),
            backend,
            upload_path,
            compression: CompressionOptions {
                enabled: req.enable_compression.unwrap_or(true),
                split: req.split_compression.unwrap_or(false),
                split_size_mb: req.split_size.unwrap_or_else(default_split_size_mb),
            },
            proxy,
            rate_limit: req.rate_limit.filter(|r| !r.trim().is_empty()),
        })
    }
}

fn required(field: Option<String>, key: &str) -> Result<String> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::config(format!("{key} is required"), key)),
    }
}

/// Flat wire request for submitting a job
///
/// Mirrors the form fields a front-end posts; `JobSpec::from_request`
/// turns it into the typed spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Source URL to fetch
    pub url: String,
    /// Upload backend: "onedrive", "googledrive", or "webdav"
    pub upload_service: String,
    /// Destination path on the remote
    pub upload_path: String,
    /// Fetch tool, defaults to gallery-dl
    #[serde(default)]
    pub downloader: Option<DownloaderKind>,
    /// Pack the download into a tar.zst archive (default true)
    #[serde(default)]
    pub enable_compression: Option<bool>,
    /// Split the archive into fixed-size parts
    #[serde(default)]
    pub split_compression: Option<bool>,
    /// Part size in megabytes when splitting
    #[serde(default)]
    pub split_size: Option<u32>,
    /// Explicit proxy URL for the download stage
    #[serde(default)]
    pub proxy: Option<String>,
    /// Probe a public proxy list when no explicit proxy is given
    #[serde(default)]
    pub auto_proxy: Option<bool>,
    /// Download rate limit passed through to the tool
    #[serde(default)]
    pub rate_limit: Option<String>,
    /// OAuth token (onedrive, googledrive)
    #[serde(default)]
    pub token: Option<String>,
    /// OneDrive drive id
    #[serde(default)]
    pub drive_id: Option<String>,
    /// OneDrive drive type (default "personal")
    #[serde(default)]
    pub drive_type: Option<String>,
    /// Google shared-drive id
    #[serde(default)]
    pub team_drive: Option<String>,
    /// WebDAV endpoint URL
    #[serde(default)]
    pub webdav_url: Option<String>,
    /// WebDAV username
    #[serde(default)]
    pub webdav_user: Option<String>,
    /// WebDAV password
    #[serde(default)]
    pub webdav_pass: Option<String>,
}

/// Pipeline state recorded in the job's status file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Download stage in progress
    Running,
    /// Archiving the downloaded payload
    Compressing,
    /// rclone transfer in progress
    Uploading,
    /// Terminal success
    Completed,
    /// Terminal failure, `error` field holds the reason
    Failed,
}

impl JobState {
    /// Lowercase wire name, as stored in the status record
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Compressing => "compressing",
            JobState::Uploading => "uploading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and spawned
    JobQueued {
        /// Job id
        id: JobId,
        /// Source URL
        url: String,
    },

    /// A pipeline stage began
    StageStarted {
        /// Job id
        id: JobId,
        /// The stage that started
        stage: JobState,
    },

    /// Job finished successfully and was cleaned up
    JobCompleted {
        /// Job id
        id: JobId,
    },

    /// Job failed at some stage
    JobFailed {
        /// Job id
        id: JobId,
        /// Error message, same text as the status record's `error` field
        error: String,
    },

    /// Auto-proxy probing picked a candidate
    ProxySelected {
        /// Job id
        id: JobId,
        /// The proxy URL that answered the probe
        proxy: String,
    },
}

/// Response body for a successful job submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Id of the accepted job
    pub job_id: JobId,
}
