//! # webdl
//!
//! Backend library for URL download-and-archive services: fetch content
//! with an external tool, optionally compress it, and push it to remote
//! storage via rclone, with file-per-job status records an embedding
//! application can poll.
//!
//! ## Design Philosophy
//!
//! webdl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **File-backed** - Per-job JSON records and log transcripts, no database
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Tidy** - Every job cleans up its local artifacts, success or failure
//!
//! ## Quick Start
//!
//! ```no_run
//! use webdl::{Config, JobManager, JobRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = JobManager::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let job_id = manager
//!         .submit(JobRequest {
//!             url: "https://example.com/gallery/123".into(),
//!             upload_service: "webdav".into(),
//!             upload_path: "backups/galleries".into(),
//!             webdav_url: Some("https://dav.example.net/dav".into()),
//!             webdav_user: Some("alice".into()),
//!             webdav_pass: Some("secret".into()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("accepted {job_id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Password hashing for embedding front-ends
pub mod auth;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-job log transcripts
pub mod joblog;
/// Job manager and pipeline
pub mod manager;
/// External command execution
pub mod process;
/// Auto-proxy discovery
pub mod proxy;
/// Transient rclone config rendering
pub mod remote;
/// Per-job status records
pub mod status;
/// Host metrics
pub mod system;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ApiConfig, Config, ProxyConfig, StorageConfig, ToolsConfig};
pub use error::{ApiError, Error, ErrorDetail, ProcessError, Result, ToHttpStatus};
pub use manager::JobManager;
pub use status::StatusStore;
pub use types::{
    CompressionOptions, DownloaderKind, Event, JobId, JobRequest, JobSpec, JobState, ProxyMode,
    SubmitResponse, UploadBackend,
};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal, then drains in-flight jobs via
/// [`JobManager::shutdown`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use webdl::{Config, JobManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = JobManager::new(Config::default()).await?;
///     manager.spawn_api_server();
///
///     run_with_shutdown(manager).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: JobManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
