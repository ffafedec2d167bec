//! Per-job pipeline execution
//!
//! One pipeline task per job: download, optional compression, upload,
//! then cleanup. Stages are strictly sequential; the first stage error
//! ends the job with a `failed` record. Cleanup is unconditional and
//! best-effort - every artifact is registered before the command that
//! populates it runs, so a failure mid-stage still leaves nothing behind.

use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::{JobManager, commands};
use crate::error::{Error, Result};
use crate::joblog::JobLog;
use crate::process::{render_command, run_command};
use crate::remote;
use crate::types::{Event, JobId, JobSpec, JobState, ProxyMode};
use crate::utils::{archive_basename, collect_prefixed_files};

/// Everything a job leaves on local disk, registered up front so cleanup
/// covers partial stages.
struct JobArtifacts {
    archives_dir: PathBuf,
    download_dir: Option<PathBuf>,
    archive_prefix: Option<String>,
    rclone_conf: Option<PathBuf>,
}

impl JobArtifacts {
    fn new(archives_dir: PathBuf) -> Self {
        Self {
            archives_dir,
            download_dir: None,
            archive_prefix: None,
            rclone_conf: None,
        }
    }

    /// Remove whatever exists; errors are ignored, missing files are fine.
    async fn cleanup(&self) {
        if let Some(dir) = &self.download_dir {
            tokio::fs::remove_dir_all(dir).await.ok();
        }
        if let Some(prefix) = &self.archive_prefix {
            if let Ok(files) = collect_prefixed_files(&self.archives_dir, prefix).await {
                for file in files {
                    tokio::fs::remove_file(file).await.ok();
                }
            }
        }
        if let Some(conf) = &self.rclone_conf {
            tokio::fs::remove_file(conf).await.ok();
        }
    }
}

/// Drive one job to a terminal state. Never returns an error: failures
/// land in the status record, the log, and a `JobFailed` event.
pub(crate) async fn run_job(manager: JobManager, spec: JobSpec) {
    let id = spec.id.clone();
    let mut artifacts = JobArtifacts::new(manager.config.archives_dir().clone());

    let log = match JobLog::create(manager.config.status_dir(), &id).await {
        Ok(log) => log,
        Err(e) => {
            error!(job = %id, error = %e, "could not open job log");
            set_status(
                &manager,
                &id,
                json!({"status": JobState::Failed.as_str(), "error": e.to_string()}),
            )
            .await
            .ok();
            manager.active_jobs.lock().await.remove(&id);
            return;
        }
    };

    match execute(&manager, &spec, &log, &mut artifacts).await {
        Ok(()) => {
            info!(job = %id, "job completed");
            set_status(&manager, &id, json!({"status": JobState::Completed.as_str()}))
                .await
                .ok();
            manager.emit_event(Event::JobCompleted { id: id.clone() });
        }
        Err(e) => {
            let message = e.to_string();
            warn!(job = %id, error = %message, "job failed");
            log.mark_job_failed(&message).await.ok();
            set_status(
                &manager,
                &id,
                json!({"status": JobState::Failed.as_str(), "error": message.clone()}),
            )
            .await
            .ok();
            manager.emit_event(Event::JobFailed {
                id: id.clone(),
                error: message,
            });
        }
    }

    artifacts.cleanup().await;
    manager.active_jobs.lock().await.remove(&id);
}

async fn execute(
    manager: &JobManager,
    spec: &JobSpec,
    log: &JobLog,
    artifacts: &mut JobArtifacts,
) -> Result<()> {
    let config = manager.get_config();
    let id = &spec.id;
    let timeout = config.tools.stage_timeout;

    manager.emit_event(Event::StageStarted {
        id: id.clone(),
        stage: JobState::Running,
    });

    // Proxy resolution: the chosen proxy goes onto the download command
    // line where the tool supports it, and into the environment for the
    // ones that do not.
    let resolved_proxy = match &spec.proxy {
        ProxyMode::None => None,
        ProxyMode::Manual(proxy) => {
            log.append_line(&format!("[proxy] using {proxy}")).await?;
            Some(proxy.clone())
        }
        ProxyMode::Auto => {
            let found = manager.proxy_selector.find_working_proxy(log).await;
            if let Some(proxy) = &found {
                manager.emit_event(Event::ProxySelected {
                    id: id.clone(),
                    proxy: proxy.clone(),
                });
            }
            found
        }
    };
    let mut download_env = HashMap::new();
    if let Some(proxy) = &resolved_proxy {
        proxy_env(&mut download_env, proxy);
        set_status(manager, id, json!({"proxy": proxy})).await?;
    }

    // Download into a job-owned subdirectory.
    let job_dir = config.downloads_dir().join(id.as_str());
    tokio::fs::create_dir_all(&job_dir).await?;
    artifacts.download_dir = Some(job_dir.clone());

    let (program, args) =
        commands::download_command(&config.tools, spec, &job_dir, resolved_proxy.as_deref())?;
    set_status(manager, id, json!({"command": render_command(&program, &args)})).await?;
    run_command(&program, &args, log, &download_env, timeout).await?;

    // Optional compression.
    let no_env = HashMap::new();
    let mut upload_files = Vec::new();
    if spec.compression.enabled {
        set_status(manager, id, json!({"status": JobState::Compressing.as_str()})).await?;
        manager.emit_event(Event::StageStarted {
            id: id.clone(),
            stage: JobState::Compressing,
        });

        let archive_name = format!("{}.tar.zst", archive_basename(&spec.url, Utc::now()));
        // Registered before the command runs: a half-written archive or a
        // subset of split parts still matches the prefix at cleanup.
        artifacts.archive_prefix = Some(archive_name.clone());
        let archive_path = config.archives_dir().join(&archive_name);

        let (shell, shell_args) = commands::compress_command(
            &config.tools,
            config.downloads_dir(),
            id.as_str(),
            &archive_path,
            spec.compression.split,
            spec.compression.split_size_mb,
        );
        run_command(&shell, &shell_args, log, &no_env, timeout).await?;

        upload_files = if spec.compression.split {
            collect_prefixed_files(config.archives_dir(), &archive_name).await?
        } else {
            vec![archive_path]
        };
        if upload_files.is_empty() {
            return Err(Error::Other("compression produced no archive parts".into()));
        }
        // The shell reports the last pipeline command's status, so a tar
        // failure can still exit 0 with a truncated archive behind it.
        ensure_nonempty_archives(&upload_files).await?;

        let names: Vec<String> = upload_files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        set_status(manager, id, json!({"archives": names})).await?;
    }

    // Upload through a transient, job-private rclone config.
    set_status(manager, id, json!({"status": JobState::Uploading.as_str()})).await?;
    manager.emit_event(Event::StageStarted {
        id: id.clone(),
        stage: JobState::Uploading,
    });

    let conf_path = remote::write_backend_config(config.status_dir(), id, &spec.backend).await?;
    artifacts.rclone_conf = Some(conf_path.clone());

    if spec.compression.enabled {
        for file in &upload_files {
            let (program, args) =
                commands::upload_file_command(&config.tools, &conf_path, file, &spec.upload_path)?;
            run_command(&program, &args, log, &no_env, timeout).await?;
        }
    } else {
        let (program, args) =
            commands::upload_dir_command(&config.tools, &conf_path, &job_dir, &spec.upload_path)?;
        run_command(&program, &args, log, &no_env, timeout).await?;
    }

    Ok(())
}

/// Reject zero-byte archive parts before they reach the upload stage.
async fn ensure_nonempty_archives(files: &[PathBuf]) -> Result<()> {
    for file in files {
        if tokio::fs::metadata(file).await?.len() == 0 {
            return Err(Error::Other(format!(
                "compression produced an empty archive: {}",
                file.display()
            )));
        }
    }
    Ok(())
}

/// Both lowercase and uppercase forms; tools differ in which they honor.
fn proxy_env(env: &mut HashMap<String, String>, proxy: &str) {
    for key in ["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY"] {
        env.insert(key.to_string(), proxy.to_string());
    }
}

async fn set_status(manager: &JobManager, id: &JobId, value: Value) -> Result<()> {
    if let Value::Object(map) = value {
        manager.status.update(id, map).await?;
    }
    Ok(())
}
