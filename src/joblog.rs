//! Append-only per-job log transcript
//!
//! One `{status_dir}/{id}.log` file per job, carrying a start marker, a
//! `[run]` header per external command, the tool's interleaved output, and
//! `[ok]`/`[error]` outcome markers. Clones share the underlying file
//! handle so the runner's stdout and stderr forwarders append through the
//! same writer.

use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::types::JobId;

/// Path of the log file for `id` under `status_dir`
pub fn log_path(status_dir: &Path, id: &JobId) -> PathBuf {
    status_dir.join(format!("{id}.log"))
}

/// Shared append-only writer for one job's transcript
#[derive(Clone, Debug)]
pub struct JobLog {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl JobLog {
    /// Open (or create) the job's log and write the start marker
    pub async fn create(status_dir: &Path, id: &JobId) -> Result<Self> {
        let path = log_path(status_dir, id);
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let log = Self {
            path,
            file: Arc::new(Mutex::new(file)),
        };
        let started = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        log.append_line(&format!("--- job {id} started at {started} ---"))
            .await?;
        Ok(log)
    }

    /// Location of the transcript on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line (a trailing newline is added)
    pub async fn append_line(&self, line: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    /// Append raw bytes as captured from a tool's output stream
    pub async fn append_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Write the `[run]` header announcing a command
    pub async fn run_header(&self, command: &str) -> Result<()> {
        self.append_line(&format!("[run] {command}")).await
    }

    /// Mark the last command as succeeded
    pub async fn mark_ok(&self) -> Result<()> {
        self.append_line("[ok]").await
    }

    /// Mark the last command as failed
    pub async fn mark_error(&self, message: &str) -> Result<()> {
        self.append_line(&format!("[error] {message}")).await
    }

    /// Terminal failure marker for the whole job
    pub async fn mark_job_failed(&self, message: &str) -> Result<()> {
        self.append_line(&format!("--- JOB FAILED: {message} ---"))
            .await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn transcript_carries_markers_in_order() {
        let dir = TempDir::new().unwrap();
        let id = JobId::from("log-1");

        let log = JobLog::create(dir.path(), &id).await.unwrap();
        log.run_header("gallery-dl https://example.com").await.unwrap();
        log.append_bytes(b"fetched 3 files\n").await.unwrap();
        log.mark_ok().await.unwrap();
        log.run_header("rclone copyto ...").await.unwrap();
        log.mark_error("exit code 1").await.unwrap();
        log.mark_job_failed("upload failed").await.unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("--- job log-1 started at "));
        assert_eq!(lines[1], "[run] gallery-dl https://example.com");
        assert_eq!(lines[2], "fetched 3 files");
        assert_eq!(lines[3], "[ok]");
        assert_eq!(lines[4], "[run] rclone copyto ...");
        assert_eq!(lines[5], "[error] exit code 1");
        assert_eq!(lines[6], "--- JOB FAILED: upload failed ---");
    }

    #[tokio::test]
    async fn clones_append_to_the_same_file() {
        let dir = TempDir::new().unwrap();
        let id = JobId::from("log-2");

        let log = JobLog::create(dir.path(), &id).await.unwrap();
        let clone = log.clone();
        log.append_line("from original").await.unwrap();
        clone.append_line("from clone").await.unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("from original"));
        assert!(text.contains("from clone"));
    }

    #[tokio::test]
    async fn reopening_appends_instead_of_truncating() {
        let dir = TempDir::new().unwrap();
        let id = JobId::from("log-3");

        {
            let log = JobLog::create(dir.path(), &id).await.unwrap();
            log.append_line("first run").await.unwrap();
        }
        let log = JobLog::create(dir.path(), &id).await.unwrap();
        log.append_line("second run").await.unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("first run"));
        assert!(text.contains("second run"));
    }
}
