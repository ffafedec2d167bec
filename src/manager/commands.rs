//! Command-line builders for the pipeline's external tools
//!
//! Pure functions from job parameters to `(program, args)` pairs, kept
//! separate from the pipeline so the exact invocations are testable
//! without running anything.

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::remote::REMOTE_NAME;
use crate::types::{DownloaderKind, JobSpec};
use crate::utils::find_tool;

/// Download invocation: the configured fetch tool writing into `job_dir`.
///
/// gallery-dl takes the resolved proxy on its command line, so the
/// persisted `command` field shows it; megadl does not support a proxy
/// flag and picks it up from the environment instead.
pub(crate) fn download_command(
    tools: &ToolsConfig,
    spec: &JobSpec,
    job_dir: &Path,
    proxy: Option<&str>,
) -> Result<(PathBuf, Vec<String>)> {
    let dir = job_dir.display().to_string();
    match spec.downloader {
        DownloaderKind::GalleryDl => {
            let program = find_tool("gallery-dl", tools.gallery_dl_path.as_ref(), tools.search_path)?;
            let mut args = vec!["-D".to_string(), dir];
            if let Some(proxy) = proxy {
                args.push("--proxy".to_string());
                args.push(proxy.to_string());
            }
            if let Some(rate) = &spec.rate_limit {
                args.push("--limit-rate".to_string());
                args.push(rate.clone());
            }
            args.push(spec.url.to_string());
            Ok((program, args))
        }
        DownloaderKind::Megadl => {
            let program = find_tool("megadl", tools.megadl_path.as_ref(), tools.search_path)?;
            let mut args = vec!["--path".to_string(), dir];
            if let Some(rate) = &spec.rate_limit {
                args.push("--limit-speed".to_string());
                args.push(rate.clone());
            }
            args.push(spec.url.to_string());
            Ok((program, args))
        }
    }
}

/// Compression invocation: a `tar | zstd` shell pipeline over the job's
/// payload subtree, optionally split into fixed-size parts.
///
/// `set -o pipefail` is not portable to every /bin/sh, so the pipeline
/// relies on tar failing loudly (empty input dir) and zstd/split failing
/// on write errors; the shell's exit status is the last command's.
pub(crate) fn compress_command(
    tools: &ToolsConfig,
    downloads_dir: &Path,
    job_dir_name: &str,
    archive_path: &Path,
    split: bool,
    split_size_mb: u32,
) -> (PathBuf, Vec<String>) {
    let parent = downloads_dir.display().to_string();
    let archive = archive_path.display().to_string();
    let script = if split {
        format!(
            "tar -C '{parent}' -cf - '{job_dir_name}' | zstd -q | split -b {split_size_mb}M - '{archive}.part-'"
        )
    } else {
        format!("tar -C '{parent}' -cf - '{job_dir_name}' | zstd -q -o '{archive}'")
    };
    (
        tools.shell_path.clone(),
        vec!["-c".to_string(), script],
    )
}

/// Upload one file to `{upload_path}/{filename}` on the transient remote
pub(crate) fn upload_file_command(
    tools: &ToolsConfig,
    conf_path: &Path,
    file: &Path,
    upload_path: &str,
) -> Result<(PathBuf, Vec<String>)> {
    let program = find_tool("rclone", tools.rclone_path.as_ref(), tools.search_path)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok((
        program,
        vec![
            "--config".to_string(),
            conf_path.display().to_string(),
            "copyto".to_string(),
            file.display().to_string(),
            format!("{REMOTE_NAME}:{upload_path}/{filename}"),
        ],
    ))
}

/// Upload a directory tree as-is (compression disabled)
pub(crate) fn upload_dir_command(
    tools: &ToolsConfig,
    conf_path: &Path,
    dir: &Path,
    upload_path: &str,
) -> Result<(PathBuf, Vec<String>)> {
    let program = find_tool("rclone", tools.rclone_path.as_ref(), tools.search_path)?;
    Ok((
        program,
        vec![
            "--config".to_string(),
            conf_path.display().to_string(),
            "copy".to_string(),
            dir.display().to_string(),
            format!("{REMOTE_NAME}:{upload_path}"),
        ],
    ))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobRequest;

    fn tools() -> ToolsConfig {
        ToolsConfig {
            gallery_dl_path: Some(PathBuf::from("/usr/bin/gallery-dl")),
            megadl_path: Some(PathBuf::from("/usr/bin/megadl")),
            rclone_path: Some(PathBuf::from("/usr/bin/rclone")),
            ..ToolsConfig::default()
        }
    }

    fn spec(downloader: DownloaderKind, rate: Option<&str>) -> JobSpec {
        let mut spec = JobSpec::from_request(JobRequest {
            url: "https://example.com/g/1".into(),
            upload_service: "webdav".into(),
            upload_path: "dest".into(),
            webdav_url: Some("https://dav".into()),
            webdav_user: Some("u".into()),
            webdav_pass: Some("p".into()),
            rate_limit: rate.map(String::from),
            ..Default::default()
        })
        .unwrap();
        spec.downloader = downloader;
        spec
    }

    #[test]
    fn gallery_dl_invocation() {
        let (program, args) =
            download_command(&tools(), &spec(DownloaderKind::GalleryDl, None), Path::new("/work/j1"), None)
                .unwrap();

        assert_eq!(program, PathBuf::from("/usr/bin/gallery-dl"));
        assert_eq!(args, vec!["-D", "/work/j1", "https://example.com/g/1"]);
    }

    #[test]
    fn gallery_dl_proxy_appears_on_the_command_line() {
        let (_, args) = download_command(
            &tools(),
            &spec(DownloaderKind::GalleryDl, None),
            Path::new("/work/j1"),
            Some("http://1.2.3.4:8080"),
        )
        .unwrap();
        assert!(args.windows(2).any(|w| w == ["--proxy", "http://1.2.3.4:8080"]));
    }

    #[test]
    fn gallery_dl_rate_limit_flag() {
        let (_, args) = download_command(
            &tools(),
            &spec(DownloaderKind::GalleryDl, Some("500k")),
            Path::new("/work/j1"),
            None,
        )
        .unwrap();
        assert!(args.windows(2).any(|w| w == ["--limit-rate", "500k"]));
    }

    #[test]
    fn megadl_invocation() {
        let (program, args) = download_command(
            &tools(),
            &spec(DownloaderKind::Megadl, Some("1M")),
            Path::new("/work/j2"),
            Some("http://1.2.3.4:8080"),
        )
        .unwrap();

        assert_eq!(program, PathBuf::from("/usr/bin/megadl"));
        assert_eq!(
            args,
            vec!["--path", "/work/j2", "--limit-speed", "1M", "https://example.com/g/1"]
        );
    }

    #[test]
    fn compress_pipeline_plain() {
        let (shell, args) = compress_command(
            &ToolsConfig::default(),
            Path::new("/data/downloads"),
            "job-1",
            Path::new("/data/archives/example_com_x.tar.zst"),
            false,
            1000,
        );

        assert_eq!(shell, PathBuf::from("/bin/sh"));
        assert_eq!(args[0], "-c");
        assert_eq!(
            args[1],
            "tar -C '/data/downloads' -cf - 'job-1' | zstd -q -o '/data/archives/example_com_x.tar.zst'"
        );
    }

    #[test]
    fn compress_pipeline_split() {
        let (_, args) = compress_command(
            &ToolsConfig::default(),
            Path::new("/d"),
            "j",
            Path::new("/a/x.tar.zst"),
            true,
            500,
        );
        assert!(args[1].contains("| split -b 500M - '/a/x.tar.zst.part-'"));
    }

    #[test]
    fn upload_file_targets_remote_section() {
        let (program, args) = upload_file_command(
            &tools(),
            Path::new("/s/j_rclone.conf"),
            Path::new("/a/x.tar.zst"),
            "backups/site",
        )
        .unwrap();

        assert_eq!(program, PathBuf::from("/usr/bin/rclone"));
        assert_eq!(
            args,
            vec![
                "--config",
                "/s/j_rclone.conf",
                "copyto",
                "/a/x.tar.zst",
                "remote:backups/site/x.tar.zst",
            ]
        );
    }

    #[test]
    fn upload_dir_copies_tree() {
        let (_, args) = upload_dir_command(
            &tools(),
            Path::new("/s/j_rclone.conf"),
            Path::new("/d/j"),
            "backups",
        )
        .unwrap();
        assert_eq!(args[2], "copy");
        assert_eq!(args[3], "/d/j");
        assert_eq!(args[4], "remote:backups");
    }
}
