//! Transient rclone config rendering
//!
//! Each upload runs against a single-section config file written just
//! before the transfer and deleted during cleanup. Nothing is ever added
//! to the user's own rclone config, and no credentials outlive the job.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{JobId, UploadBackend};

/// Section name used inside every transient config
pub const REMOTE_NAME: &str = "remote";

/// Path of the transient config for `id` under `status_dir`
pub fn conf_path(status_dir: &Path, id: &JobId) -> PathBuf {
    status_dir.join(format!("{id}_rclone.conf"))
}

/// Render the `[remote]` section for a backend
pub fn render_backend_config(backend: &UploadBackend) -> String {
    match backend {
        UploadBackend::Onedrive {
            token,
            drive_id,
            drive_type,
        } => format!(
            "[{REMOTE_NAME}]\n\
             type = onedrive\n\
             token = {token}\n\
             drive_id = {drive_id}\n\
             drive_type = {drive_type}\n"
        ),
        UploadBackend::Googledrive { token, team_drive } => format!(
            "[{REMOTE_NAME}]\n\
             type = drive\n\
             token = {token}\n\
             team_drive = {team_drive}\n"
        ),
        UploadBackend::Webdav { url, user, pass } => format!(
            "[{REMOTE_NAME}]\n\
             type = webdav\n\
             url = {url}\n\
             vendor = other\n\
             user = {user}\n\
             pass = {pass}\n"
        ),
    }
}

/// Write the per-job config file and return its path. The caller owns
/// deletion; cleanup removes it whether or not the upload ran.
pub async fn write_backend_config(
    status_dir: &Path,
    id: &JobId,
    backend: &UploadBackend,
) -> Result<PathBuf> {
    let path = conf_path(status_dir, id);
    tokio::fs::write(&path, render_backend_config(backend)).await?;
    Ok(path)
}
