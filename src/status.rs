//! File-per-job status records
//!
//! Each job owns one JSON file `{status_dir}/{id}.json` holding a flat
//! object. Writers merge new fields over the existing record and replace
//! the file atomically (tmp write then rename), so concurrent readers
//! always see a complete document. There is no cross-job state, which
//! keeps concurrent jobs free of contention by construction.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::types::JobId;

/// Store of per-job status records under a single directory
#[derive(Clone, Debug)]
pub struct StatusStore {
    dir: PathBuf,
}

impl StatusStore {
    /// Create a store rooted at `dir`. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the record file for `id`
    pub fn record_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Merge `fields` into the job's record and persist it.
    ///
    /// Creates the record if absent, stamping `id` and `created_at` once.
    /// `updated_at` is refreshed on every write. A corrupt existing file is
    /// treated as absent rather than aborting the update. Returns the
    /// merged record.
    pub async fn update(&self, id: &JobId, fields: Map<String, Value>) -> Result<Value> {
        let path = self.record_path(id);

        let mut record = match read_record(&path).await {
            Some(existing) => existing,
            None => {
                let mut fresh = Map::new();
                fresh.insert("id".to_string(), Value::String(id.to_string()));
                fresh.insert("created_at".to_string(), Value::String(now_rfc3339()));
                fresh
            }
        };

        for (key, value) in fields {
            record.insert(key, value);
        }
        record.insert("updated_at".to_string(), Value::String(now_rfc3339()));

        let body = serde_json::to_vec_pretty(&record)?;

        // Write-then-rename so readers never observe a torn record.
        let tmp = self.dir.join(format!("{id}.json.tmp"));
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(Value::Object(record))
    }

    /// Fetch one record, or None when the job is unknown or its file is corrupt
    pub async fn get(&self, id: &JobId) -> Option<Value> {
        read_record(&self.record_path(id))
            .await
            .map(Value::Object)
    }

    /// All records, newest-modified first.
    ///
    /// Files that fail to parse are skipped with a warning so one corrupt
    /// record cannot take down the listing.
    pub async fn get_all(&self) -> Result<Vec<Value>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

            match read_record(&path).await {
                Some(record) => entries.push((modified, Value::Object(record))),
                None => {
                    warn!(path = %path.display(), "skipping unreadable status record");
                }
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }
}

async fn read_record(path: &Path) -> Option<Map<String, Value>> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// UTC timestamp with millisecond precision, e.g. "2026-08-30T12:00:00.123Z"
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
