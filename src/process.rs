//! External command execution with transcript capture
//!
//! The runner launches a tool with piped stdout/stderr, forwards both
//! streams into the job log as they arrive (per-stream order preserved,
//! cross-stream interleaving best-effort), and maps the exit status to a
//! [`ProcessError`]. One invocation per call; callers decide whether a
//! failure is fatal.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ProcessError, Result};
use crate::joblog::JobLog;

/// Render a command line for log headers and error messages
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

/// Run `program` with `args`, streaming its output into `log`.
///
/// `env_overrides` is merged over the inherited environment. When `timeout`
/// is set and elapses, the child is killed and the call fails with
/// [`ProcessError::TimedOut`]. Success means exit code 0; anything else is
/// [`ProcessError::ExitCode`] with an `[error]` marker in the transcript.
pub async fn run_command(
    program: &Path,
    args: &[String],
    log: &JobLog,
    env_overrides: &HashMap<String, String>,
    timeout: Option<Duration>,
) -> Result<()> {
    let rendered = render_command(program, args);
    log.run_header(&rendered).await?;
    debug!(command = %rendered, "launching external tool");

    let mut child = Command::new(program)
        .args(args.iter().map(OsStr::new))
        .envs(env_overrides)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            command: rendered.clone(),
            source,
        })?;

    // Forward each stream line-by-line; a log write error just stops the
    // forwarder, the exit status still decides the outcome.
    let stdout_task = child.stdout.take().map(|out| forward(out, log.clone()));
    let stderr_task = child.stderr.take().map(|err| forward(err, log.clone()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                child.start_kill().ok();
                let _ = child.wait().await;
                log.mark_error(&format!("timed out after {}s", limit.as_secs()))
                    .await?;
                return Err(ProcessError::TimedOut {
                    command: rendered,
                    timeout: limit,
                }
                .into());
            }
        },
        None => child.wait().await?,
    };

    if let Some(task) = stdout_task {
        task.await.ok();
    }
    if let Some(task) = stderr_task {
        task.await.ok();
    }

    if status.success() {
        log.mark_ok().await?;
        Ok(())
    } else {
        let code = status.code();
        log.mark_error(&match code {
            Some(c) => format!("exit code {c}"),
            None => "killed by signal".to_string(),
        })
        .await?;
        Err(ProcessError::ExitCode {
            command: rendered,
            code,
        }
        .into())
    }
}

fn forward<R>(stream: R, log: JobLog) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if log.append_line(&line).await.is_err() {
                break;
            }
        }
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::JobId;
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn log_in(dir: &TempDir, name: &str) -> JobLog {
        JobLog::create(dir.path(), &JobId::from(name)).await.unwrap()
    }

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn successful_command_logs_header_output_and_ok() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-ok").await;

        run_command(&sh(), &args("echo hello"), &log, &HashMap::new(), None)
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("[run] /bin/sh -c echo hello"));
        assert!(text.contains("hello"));
        assert!(text.contains("[ok]"));
    }

    #[tokio::test]
    async fn nonzero_exit_yields_exit_code_error_and_marker() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-fail").await;

        let err = run_command(&sh(), &args("exit 3"), &log, &HashMap::new(), None)
            .await
            .unwrap_err();

        match err {
            Error::Process(ProcessError::ExitCode { code, .. }) => assert_eq!(code, Some(3)),
            other => panic!("expected ExitCode, got {other:?}"),
        }
        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("[error] exit code 3"));
        assert!(!text.contains("[ok]"));
    }

    #[tokio::test]
    async fn stderr_is_captured_too() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-stderr").await;

        let _ = run_command(
            &sh(),
            &args("echo oops >&2; exit 1"),
            &log,
            &HashMap::new(),
            None,
        )
        .await;

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("oops"));
    }

    #[tokio::test]
    async fn missing_binary_yields_spawn_error() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-spawn").await;

        let err = run_command(
            &PathBuf::from("/nonexistent/tool"),
            &[],
            &log,
            &HashMap::new(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Process(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    async fn env_overrides_reach_the_child() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-env").await;

        let mut env = HashMap::new();
        env.insert("WEBDL_TEST_VAR".to_string(), "proxied".to_string());
        run_command(&sh(), &args("echo $WEBDL_TEST_VAR"), &log, &env, None)
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("proxied"));
    }

    #[tokio::test]
    async fn hung_command_is_killed_on_timeout() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "p-timeout").await;

        let started = std::time::Instant::now();
        let err = run_command(
            &sh(),
            &args("sleep 30"),
            &log,
            &HashMap::new(),
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Process(ProcessError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(text.contains("timed out"));
    }
}
