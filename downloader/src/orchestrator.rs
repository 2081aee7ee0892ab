/// Download orchestration.
///
/// Registers a queued task, spawns `yt-dlp` in download mode and returns the
/// task id at once. Stdout and stderr are pumped line by line into a per-task
/// channel; a single driver drains the channel into the registry and then
/// records the exit outcome.
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use grabber_shared::errors::{GrabberError, GrabberResult};
use grabber_shared::models::{Task, TaskEvent};
use grabber_shared::progress::{parse_line, ProgressDelta};
use grabber_shared::task_registry::TaskRegistry;

use crate::artifact;
use crate::ytdlp::YtDlp;

#[derive(Clone)]
pub struct Orchestrator {
    ytdlp: YtDlp,
    registry: TaskRegistry,
}

impl Orchestrator {
    pub fn new(ytdlp: YtDlp, registry: TaskRegistry) -> Self {
        Self { ytdlp, registry }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn ytdlp(&self) -> &YtDlp {
        &self.ytdlp
    }

    /// Start a download in the background and return its task id.
    pub async fn start(&self, url: &str, format_id: Option<&str>) -> GrabberResult<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(GrabberError::Validation("URL is required".into()));
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        self.registry.insert(Task::new(&task_id)).await;

        let args = self.ytdlp.download_args(&task_id, url, format_id);
        self.registry
            .apply(
                &task_id,
                TaskEvent::Log(format!("[system] Spawning yt-dlp with args: {}", args.join(" "))),
            )
            .await;

        info!("Download queued: task={} url={}", task_id, url);
        tokio::spawn(run(self.ytdlp.clone(), self.registry.clone(), task_id.clone(), args));

        Ok(task_id)
    }
}

/// Translate one stdout line into the events it carries.
fn stdout_events(line: &str) -> Vec<TaskEvent> {
    let mut events = Vec::with_capacity(2);
    match parse_line(line) {
        Some(ProgressDelta::Percent { percent, speed, eta }) => {
            events.push(TaskEvent::Progress { percent, speed, eta });
        }
        Some(ProgressDelta::PostProcessing) => events.push(TaskEvent::PostProcessing),
        None => {}
    }
    events.push(TaskEvent::Log(line.to_string()));
    events
}

/// Forward every non-empty line of a stream as events.
async fn pump<R>(stream: R, tx: mpsc::UnboundedSender<TaskEvent>, to_events: fn(&str) -> Vec<TaskEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.trim().is_empty() {
                    continue;
                }
                for event in to_events(line) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read yt-dlp output: {}", e);
                break;
            }
        }
    }
}

/// Own the child process for its whole lifetime.
async fn run(ytdlp: YtDlp, registry: TaskRegistry, task_id: String, args: Vec<String>) {
    let mut child = match ytdlp
        .command()
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to spawn yt-dlp for task {}: {}", task_id, e);
            registry
                .apply(&task_id, TaskEvent::Failed(format!("Failed to spawn yt-dlp: {}", e)))
                .await;
            return;
        }
    };

    debug!("yt-dlp spawned for task {} (pid: {:?})", task_id, child.id());

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, tx.clone(), stdout_events));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, tx.clone(), |line| vec![TaskEvent::Stderr(line.to_string())]));
    }
    drop(tx);

    while let Some(event) = rx.recv().await {
        registry.apply(&task_id, event).await;
    }

    let outcome = match child.wait().await {
        Ok(status) => exit_event(status, &ytdlp, &task_id).await,
        Err(e) => TaskEvent::Failed(format!("Failed to wait for yt-dlp: {}", e)),
    };
    registry.apply(&task_id, outcome).await;
}

async fn exit_event(status: ExitStatus, ytdlp: &YtDlp, task_id: &str) -> TaskEvent {
    if !status.success() {
        return match status.code() {
            Some(code) => TaskEvent::Failed(format!("Process exited with code {}", code)),
            None => TaskEvent::Failed("Process terminated by signal".to_string()),
        };
    }

    match artifact::locate(ytdlp.download_dir(), task_id).await {
        Ok(Some(path)) => TaskEvent::Finished {
            path: path.to_string_lossy().to_string(),
        },
        Ok(None) => {
            warn!("Task {} exited cleanly but left no artifact", task_id);
            TaskEvent::OutputMissing("File not found after download".to_string())
        }
        Err(e) => TaskEvent::OutputMissing(format!("Error finding file: {}", e)),
    }
}
