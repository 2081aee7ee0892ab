/// Task and media models shared across all Grabber crates.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of most recent output lines kept on a task.
pub const MAX_LOG_LINES: usize = 50;

/// Download task status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Downloading,
    Processing,
    Finished,
    /// The tool exited cleanly but no artifact carrying the task prefix was found.
    OutputMissing,
    Error,
}

impl TaskStatus {
    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::OutputMissing | TaskStatus::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Downloading => write!(f, "downloading"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Finished => write!(f, "finished"),
            TaskStatus::OutputMissing => write!(f, "output_missing"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

/// A state change delivered to a task by its download driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A line of tool stdout or a system note.
    Log(String),
    /// A line of tool stderr.
    Stderr(String),
    /// A parsed download percentage.
    Progress {
        percent: f64,
        speed: Option<String>,
        eta: Option<String>,
    },
    /// The tool moved on to merging, converting or fixing up the artifact.
    PostProcessing,
    /// Clean exit with the located artifact.
    Finished { path: String },
    /// Clean exit, but the artifact could not be located.
    OutputMissing(String),
    /// Spawn failure, non-zero exit or signal.
    Failed(String),
}

/// Download task record, returned verbatim to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub logs: Vec<String>,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Queued,
            progress: 0.0,
            logs: vec!["[system] Task initialized...".to_string()],
            filename: None,
            error: None,
            speed: None,
            eta: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Apply an event. Returns false when the task is already terminal and
    /// the event was dropped.
    pub fn apply(&mut self, event: TaskEvent) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match event {
            TaskEvent::Log(line) => self.push_log(line),
            TaskEvent::Stderr(line) => self.push_log(format!("[stderr] {}", line)),
            TaskEvent::Progress { percent, speed, eta } => {
                self.progress = percent.clamp(0.0, 100.0);
                if speed.is_some() {
                    self.speed = speed;
                }
                if eta.is_some() {
                    self.eta = eta;
                }
                if self.status == TaskStatus::Queued {
                    self.status = TaskStatus::Downloading;
                }
            }
            TaskEvent::PostProcessing => self.status = TaskStatus::Processing,
            TaskEvent::Finished { path } => {
                let name = std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.clone());
                self.status = TaskStatus::Finished;
                self.progress = 100.0;
                self.eta = None;
                self.push_log("[system] Download complete!".to_string());
                self.push_log(format!("[system] File ready: {}", name));
                self.filename = Some(path);
                self.finished_at = Some(Utc::now());
            }
            TaskEvent::OutputMissing(reason) => {
                self.status = TaskStatus::OutputMissing;
                self.push_log(format!("[system] {}", reason));
                self.error = Some(reason);
                self.finished_at = Some(Utc::now());
            }
            TaskEvent::Failed(reason) => {
                self.status = TaskStatus::Error;
                self.push_log(format!("[system] {}", reason));
                self.error = Some(reason);
                self.finished_at = Some(Utc::now());
            }
        }
        true
    }

    fn push_log(&mut self, line: String) {
        self.logs.push(line);
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }
}

/// One format entry as emitted by `yt-dlp -j`. Only the fields the reducer
/// reads are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Average audio bitrate, kbit/s.
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate, kbit/s.
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

impl RawFormat {
    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.vcodec.as_deref() == Some("none") && self.has_audio()
    }
}

/// Resource description as emitted by `yt-dlp -j`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// A curated, user-facing format choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatOption {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: String,
    pub filesize: Option<u64>,
    pub note: String,
}

/// Metadata response for the request form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub formats: Vec<FormatOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_queued() {
        let task = Task::new("t1");
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.progress, 0.0);
        assert_eq!(task.logs, vec!["[system] Task initialized...".to_string()]);
        assert!(task.filename.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_progress_moves_to_downloading() {
        let mut task = Task::new("t1");
        task.apply(TaskEvent::Progress { percent: 24.5, speed: Some("2.50MiB/s".into()), eta: None });
        assert_eq!(task.status, TaskStatus::Downloading);
        assert_eq!(task.progress, 24.5);
        assert_eq!(task.speed.as_deref(), Some("2.50MiB/s"));
    }

    #[test]
    fn test_progress_does_not_leave_processing() {
        let mut task = Task::new("t1");
        task.apply(TaskEvent::Progress { percent: 100.0, speed: None, eta: None });
        task.apply(TaskEvent::PostProcessing);
        task.apply(TaskEvent::Progress { percent: 50.0, speed: None, eta: None });
        assert_eq!(task.status, TaskStatus::Processing);
    }

    #[test]
    fn test_logs_are_capped() {
        let mut task = Task::new("t1");
        for i in 0..120 {
            task.apply(TaskEvent::Log(format!("line {}", i)));
        }
        assert_eq!(task.logs.len(), MAX_LOG_LINES);
        assert_eq!(task.logs.last().map(String::as_str), Some("line 119"));
        assert_eq!(task.logs.first().map(String::as_str), Some("line 70"));
    }

    #[test]
    fn test_stderr_is_prefixed() {
        let mut task = Task::new("t1");
        task.apply(TaskEvent::Stderr("WARNING: slow".into()));
        assert_eq!(task.logs.last().map(String::as_str), Some("[stderr] WARNING: slow"));
        assert_eq!(task.status, TaskStatus::Queued);
    }

    #[test]
    fn test_finished_records_file() {
        let mut task = Task::new("abc");
        task.apply(TaskEvent::Finished { path: "/dl/abc_Song.m4a".into() });
        assert_eq!(task.status, TaskStatus::Finished);
        assert_eq!(task.progress, 100.0);
        assert_eq!(task.filename.as_deref(), Some("/dl/abc_Song.m4a"));
        assert!(task.finished_at.is_some());
        assert_eq!(task.logs.last().map(String::as_str), Some("[system] File ready: abc_Song.m4a"));
    }

    #[test]
    fn test_output_missing_is_distinct_terminal_state() {
        let mut task = Task::new("abc");
        task.apply(TaskEvent::Progress { percent: 87.0, speed: None, eta: None });
        task.apply(TaskEvent::OutputMissing("File not found after download".into()));
        assert_eq!(task.status, TaskStatus::OutputMissing);
        assert!(task.filename.is_none());
        assert_eq!(task.error.as_deref(), Some("File not found after download"));
        assert_eq!(task.progress, 87.0);
    }

    #[test]
    fn test_terminal_absorbs_events() {
        let mut task = Task::new("abc");
        assert!(task.apply(TaskEvent::Failed("Process exited with code 1".into())));
        assert!(!task.apply(TaskEvent::Finished { path: "/dl/abc_x.mp4".into() }));
        assert!(!task.apply(TaskEvent::Failed("again".into())));
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error.as_deref(), Some("Process exited with code 1"));
        assert!(task.filename.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::OutputMissing).unwrap();
        assert_eq!(json, "\"output_missing\"");
        assert_eq!(TaskStatus::Downloading.to_string(), "downloading");
    }

    #[test]
    fn test_raw_format_classification() {
        let audio = RawFormat {
            format_id: "140".into(),
            vcodec: Some("none".into()),
            acodec: Some("mp4a.40.2".into()),
            ..Default::default()
        };
        assert!(audio.is_audio_only());

        let video_only = RawFormat {
            format_id: "137".into(),
            vcodec: Some("avc1".into()),
            acodec: Some("none".into()),
            ..Default::default()
        };
        assert!(!video_only.is_audio_only());
        assert!(!video_only.has_audio());
    }
}
