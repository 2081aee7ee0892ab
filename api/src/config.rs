/// Environment-driven configuration for the API server.
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `yt-dlp` executable.
    pub ytdlp_bin: String,
    /// Extra leading arguments for every `yt-dlp` invocation.
    pub ytdlp_args: Vec<String>,
    pub download_dir: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    /// Presentation assets served at `/`.
    pub static_dir: PathBuf,
    /// Age in seconds after which terminal tasks are evicted; 0 disables eviction.
    pub task_ttl_secs: i64,
    pub cleanup_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let ytdlp_bin = var("YT_DLP_PATH").unwrap_or_else(|| "yt-dlp".to_string());
        let ytdlp_args = var("YT_DLP_ARGS")
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        let download_dir = var("DOWNLOAD_DIR").unwrap_or_else(|| "./downloads".to_string());
        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port: u16 = var("API_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let static_dir = var("STATIC_DIR")
            .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string());
        let task_ttl_secs: i64 = var("TASK_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);
        let cleanup_interval_secs: u64 = var("TASK_CLEANUP_INTERVAL")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(300);

        Self {
            ytdlp_bin,
            ytdlp_args,
            download_dir: PathBuf::from(download_dir),
            api_host,
            api_port,
            static_dir: PathBuf::from(static_dir),
            task_ttl_secs,
            cleanup_interval_secs,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
