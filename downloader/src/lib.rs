//! Grabber downloader
//!
//! Drives the external `yt-dlp` executable: metadata extraction with format
//! reduction, and background downloads whose output is parsed into task state.
pub mod artifact;
pub mod orchestrator;
pub mod ytdlp;

pub use orchestrator::Orchestrator;
pub use ytdlp::YtDlp;
