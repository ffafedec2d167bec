//! Small shared helpers: tool discovery and archive naming

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{Error, Result};

/// Resolve an external tool: explicit config path wins, then PATH lookup.
pub fn find_tool(name: &str, explicit: Option<&PathBuf>, search_path: bool) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    if search_path {
        if let Ok(found) = which::which(name) {
            return Ok(found);
        }
    }
    Err(Error::Other(format!(
        "required tool `{name}` not found on PATH"
    )))
}

/// Deterministic, filesystem-safe archive base name for a job.
///
/// The URL host with dots replaced by underscores, joined to a UTC
/// timestamp with `:` and `.` replaced by dashes, so
/// `https://example.com/foo` fetched at 2026-08-30T12:00:00.123Z becomes
/// `example_com_2026-08-30T12-00-00-123Z`.
pub fn archive_basename(url: &Url, now: DateTime<Utc>) -> String {
    let host = url
        .host_str()
        .map(|h| h.replace('.', "_"))
        .unwrap_or_else(|| "download".to_string());
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{host}_{stamp}")
}

/// All regular files in `dir` whose names start with `prefix`, sorted by
/// name so split parts stay in order.
pub async fn collect_prefixed_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(prefix) && entry.path().is_file() {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}
