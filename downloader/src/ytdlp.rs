/// `yt-dlp` invocation: argument conventions for metadata and download mode,
/// and the metadata fetch itself.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use grabber_shared::errors::{GrabberError, GrabberResult};
use grabber_shared::formats::curate_formats;
use grabber_shared::models::{MediaInfo, RawMediaInfo};

use crate::artifact::artifact_prefix;

/// Format selector used when the client does not pick one.
pub const DEFAULT_FORMAT: &str = "best";

/// Handle on the external tool and the directory it writes into.
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// Executable to run.
    bin: String,
    /// Arguments placed before every invocation (e.g. `-m yt_dlp` or `--cookies`).
    base_args: Vec<String>,
    /// Directory that receives artifacts.
    download_dir: PathBuf,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            base_args: Vec::new(),
            download_dir: download_dir.into(),
        }
    }

    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Command with the executable and base arguments applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.base_args);
        cmd
    }

    /// Arguments for single-object JSON metadata mode.
    pub fn metadata_args(url: &str) -> Vec<String> {
        vec![
            "-j".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--".to_string(),
            url.to_string(),
        ]
    }

    /// Output template that embeds the task id as the filename prefix.
    pub fn output_template(&self, task_id: &str) -> String {
        self.download_dir
            .join(format!("{}%(title)s.%(ext)s", artifact_prefix(task_id)))
            .to_string_lossy()
            .to_string()
    }

    /// Arguments for download mode with a plain newline-delimited progress stream.
    pub fn download_args(&self, task_id: &str, url: &str, format_id: Option<&str>) -> Vec<String> {
        let format = format_id
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FORMAT);

        vec![
            "-f".to_string(),
            format.to_string(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-colors".to_string(),
            "-o".to_string(),
            self.output_template(task_id),
            "--".to_string(),
            url.to_string(),
        ]
    }

    /// Fetch resource metadata and reduce its format list.
    pub async fn fetch_metadata(&self, url: &str) -> GrabberResult<MediaInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(GrabberError::Validation("URL is required".into()));
        }

        info!("Fetching metadata for {}", url);
        let output = self
            .command()
            .args(Self::metadata_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GrabberError::Spawn(format!("{} ({})", e, self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("yt-dlp metadata failed for {}: {}", url, stderr);
            return Err(GrabberError::Upstream {
                message: "Failed to fetch video info".into(),
                detail: stderr,
            });
        }

        let raw: RawMediaInfo = serde_json::from_slice(&output.stdout)?;
        let formats = curate_formats(&raw.formats);
        debug!(
            "Reduced {} raw formats to {} for {}",
            raw.formats.len(),
            formats.len(),
            url
        );

        Ok(MediaInfo {
            title: raw.title,
            thumbnail: raw.thumbnail,
            duration: raw.duration,
            uploader: raw.uploader,
            formats,
        })
    }
}
