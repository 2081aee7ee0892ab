/// Unified error types for the Grabber system.
use thiserror::Error;

/// Request-time error raised by the metadata fetcher, registry lookups and
/// file delivery.
///
/// Download-time failures (non-zero exit of the download process) are never
/// raised; they are recorded on the task and discovered by polling.
#[derive(Debug, Error)]
pub enum GrabberError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Upstream { message: String, detail: String },

    #[error("Unexpected yt-dlp output: {0}")]
    Parse(String),

    #[error("Task not found")]
    NotFound,

    #[error("File not ready")]
    NotReady,

    #[error("File missing on disk")]
    MissingFile,

    #[error("Failed to spawn yt-dlp: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrabberError {
    /// HTTP status class for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GrabberError::Validation(_) | GrabberError::Upstream { .. } | GrabberError::NotReady => 400,
            GrabberError::NotFound | GrabberError::MissingFile => 404,
            GrabberError::Parse(_) | GrabberError::Spawn(_) | GrabberError::Io(_) => 500,
        }
    }

    /// Extra diagnostic text forwarded to the client, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GrabberError::Upstream { detail, .. } => Some(detail.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GrabberError {
    fn from(e: serde_json::Error) -> Self {
        GrabberError::Parse(e.to_string())
    }
}

/// Result type alias for Grabber operations.
pub type GrabberResult<T> = Result<T, GrabberError>;
