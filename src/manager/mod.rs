//! Job manager: submission, tracking, and lifecycle events
//!
//! The manager validates and accepts job requests, persists the initial
//! status record, and spawns one independent pipeline task per job. Jobs
//! never contend with each other: all per-job state lives in files keyed
//! by the job id, and the only shared structure is the handle map.

mod commands;
mod pipeline;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::joblog;
use crate::proxy::ProxySelector;
use crate::status::StatusStore;
use crate::types::{Event, JobId, JobRequest, JobSpec, JobState};

/// Main job manager (cloneable - all fields are Arc-wrapped or cheap)
#[derive(Clone)]
pub struct JobManager {
    /// Configuration (shared across pipeline tasks)
    pub(crate) config: Arc<Config>,
    /// Per-job status records
    pub(crate) status: StatusStore,
    /// Auto-proxy discovery
    pub(crate) proxy_selector: ProxySelector,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Join handles of in-flight pipelines, keyed by job id
    pub(crate) active_jobs: Arc<Mutex<HashMap<JobId, JoinHandle<()>>>>,
}

impl JobManager {
    /// Create a manager: validates the config, creates the storage
    /// directories, and sets up the event broadcast channel.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.status_dir()).await?;
        tokio::fs::create_dir_all(config.downloads_dir()).await?;
        tokio::fs::create_dir_all(config.archives_dir()).await?;

        let (event_tx, _rx) = broadcast::channel(1000);
        let status = StatusStore::new(config.status_dir());
        let proxy_selector = ProxySelector::new(config.proxy.clone());

        Ok(Self {
            config: Arc::new(config),
            status,
            proxy_selector,
            event_tx,
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Validate a wire request and start its pipeline.
    ///
    /// Returns the fresh job id as soon as the initial `running` record is
    /// on disk; the pipeline itself runs in a spawned task.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId> {
        let spec = JobSpec::from_request(request)?;
        self.submit_spec(spec).await
    }

    /// Start a pipeline for an already-validated spec
    pub async fn submit_spec(&self, spec: JobSpec) -> Result<JobId> {
        let id = spec.id.clone();

        let mut initial = serde_json::Map::new();
        initial.insert("status".into(), JobState::Running.as_str().into());
        initial.insert("url".into(), spec.url.as_str().into());
        initial.insert(
            "downloader".into(),
            spec.downloader.binary_name().into(),
        );
        initial.insert(
            "upload_service".into(),
            spec.backend.service_name().into(),
        );
        initial.insert("upload_path".into(), spec.upload_path.clone().into());
        self.status.update(&id, initial).await?;

        info!(job = %id, url = %spec.url, "job accepted");
        self.emit_event(Event::JobQueued {
            id: id.clone(),
            url: spec.url.to_string(),
        });

        // Insert under the lock so the task cannot observe a map without
        // its own entry, however fast it finishes.
        let mut active = self.active_jobs.lock().await;
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            pipeline::run_job(manager, spec).await;
        });
        active.insert(id.clone(), handle);

        Ok(id)
    }

    /// One job's status record, or None when unknown
    pub async fn get_status(&self, id: &JobId) -> Option<serde_json::Value> {
        self.status.get(id).await
    }

    /// All status records, newest-updated first
    pub async fn get_all_status(&self) -> Result<Vec<serde_json::Value>> {
        self.status.get_all().await
    }

    /// The job's raw log transcript, or None when no log exists yet
    pub async fn read_log(&self, id: &JobId) -> Option<String> {
        let path = joblog::log_path(self.config.status_dir(), id);
        tokio::fs::read_to_string(path).await.ok()
    }

    /// Number of pipelines currently in flight
    pub async fn active_count(&self) -> usize {
        let mut active = self.active_jobs.lock().await;
        active.retain(|_, handle| !handle.is_finished());
        active.len()
    }

    /// Block until the job's pipeline task finishes. No-op for unknown or
    /// already-finished jobs.
    pub async fn wait(&self, id: &JobId) {
        let handle = { self.active_jobs.lock().await.remove(id) };
        if let Some(handle) = handle {
            handle.await.ok();
        }
    }

    /// Drain: wait for every in-flight pipeline to reach a terminal state.
    /// New submissions during the drain are waited on too.
    pub async fn shutdown(&self) -> Result<()> {
        info!("waiting for in-flight jobs to finish");
        loop {
            let next = {
                let mut active = self.active_jobs.lock().await;
                let key = active.keys().next().cloned();
                key.and_then(|k| active.remove(&k))
            };
            match next {
                Some(handle) => {
                    handle.await.ok();
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Shared configuration handle
    pub fn get_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Emit an event to all subscribers. With no receivers the event is
    /// silently dropped; pipelines never depend on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task listening on the
    /// configured bind address (default: 127.0.0.1:6789).
    pub fn spawn_api_server(&self) -> JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.config.clone();
        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use tempfile::TempDir;

    pub(crate) fn test_config(root: &std::path::Path) -> Config {
        Config {
            storage: StorageConfig {
                status_dir: root.join("status"),
                downloads_dir: root.join("downloads"),
                archives_dir: root.join("archives"),
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn new_creates_storage_directories() {
        let root = TempDir::new().unwrap();
        let manager = JobManager::new(test_config(root.path())).await.unwrap();

        assert!(manager.config.status_dir().is_dir());
        assert!(manager.config.downloads_dir().is_dir());
        assert!(manager.config.archives_dir().is_dir());
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_without_a_record() {
        let root = TempDir::new().unwrap();
        let manager = JobManager::new(test_config(root.path())).await.unwrap();

        let result = manager.submit(JobRequest::default()).await;
        assert!(result.is_err());
        assert!(manager.get_all_status().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_writes_running_record_before_returning() {
        let root = TempDir::new().unwrap();
        let manager = JobManager::new(test_config(root.path())).await.unwrap();

        let request = JobRequest {
            url: "https://example.com/a".into(),
            upload_service: "webdav".into(),
            upload_path: "p".into(),
            webdav_url: Some("https://dav".into()),
            webdav_user: Some("u".into()),
            webdav_pass: Some("p".into()),
            ..Default::default()
        };
        let id = manager.submit(request).await.unwrap();

        let record = manager.get_status(&id).await.expect("record must exist");
        assert_eq!(record["url"], "https://example.com/a");
        assert_eq!(record["upload_service"], "webdav");
        // The pipeline may already have failed (no tools in this test),
        // but the record itself must have been created at submission.
        assert!(record.get("created_at").is_some());

        manager.wait(&id).await;
    }

    #[tokio::test]
    async fn subscribers_see_queued_events() {
        let root = TempDir::new().unwrap();
        let manager = JobManager::new(test_config(root.path())).await.unwrap();
        let mut events = manager.subscribe();

        let request = JobRequest {
            url: "https://example.com/a".into(),
            upload_service: "webdav".into(),
            upload_path: "p".into(),
            webdav_url: Some("https://dav".into()),
            webdav_user: Some("u".into()),
            webdav_pass: Some("p".into()),
            ..Default::default()
        };
        let id = manager.submit(request).await.unwrap();

        let event = events.recv().await.unwrap();
        match event {
            Event::JobQueued { id: queued, url } => {
                assert_eq!(queued, id);
                assert_eq!(url, "https://example.com/a");
            }
            other => panic!("expected JobQueued first, got {other:?}"),
        }

        manager.wait(&id).await;
    }
}
