/// Grabber API Server
///
/// HTTP front end for `yt-dlp`: metadata lookup with a curated format menu,
/// background downloads with pollable progress, and file delivery.
mod config;
mod error;
mod routes;

use std::sync::Arc;
use tracing::info;

use grabber_downloader::{Orchestrator, YtDlp};
use grabber_shared::task_registry::TaskRegistry;

use config::AppConfig;

/// Shared application state for all API handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "grabber_api=info,grabber_downloader=info,grabber_shared=info,tower_http=info".into()
            }),
        )
        .init();

    let config = AppConfig::from_env();

    // Downloads land here; recorded filenames must be absolute.
    std::fs::create_dir_all(&config.download_dir)?;
    let download_dir = config
        .download_dir
        .canonicalize()
        .unwrap_or_else(|_| config.download_dir.clone());
    info!("Download directory: {}", download_dir.display());
    info!("yt-dlp executable: {}", config.ytdlp_bin);

    let ytdlp = YtDlp::new(config.ytdlp_bin.clone(), download_dir)
        .with_base_args(config.ytdlp_args.clone());
    let registry = TaskRegistry::new();

    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(ytdlp, registry.clone()),
    });

    // Background eviction of finished tasks
    if config.task_ttl_secs > 0 {
        let ttl = config.task_ttl_secs;
        let period = config.cleanup_interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
            loop {
                interval.tick().await;
                let removed = registry.evict_terminal(ttl).await;
                if removed > 0 {
                    info!("Evicted {} finished tasks", removed);
                }
            }
        });
    }

    let app = routes::router(state, &config.static_dir);

    let addr = config.bind_addr();
    info!("Grabber API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
