/// API route handlers for the Grabber web front end.
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use grabber_downloader::artifact;
use grabber_shared::errors::GrabberError;
use grabber_shared::models::{MediaInfo, Task};

use crate::error::{error_response, ApiError};
use crate::AppState;

// ====== REQUEST TYPES ======

#[derive(Deserialize)]
pub struct MetadataBody {
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize)]
pub struct DownloadBody {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format_id: Option<String>,
}

// ====== ROUTER ======

pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/metadata", post(fetch_metadata))
        .route("/tasks", post(start_download))
        .route("/tasks/:id", get(get_task))
        .route("/tasks/:id/file", get(download_file))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ====== HANDLERS ======

/// POST /metadata
pub async fn fetch_metadata(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MetadataBody>,
) -> Result<Json<MediaInfo>, ApiError> {
    state
        .orchestrator
        .ytdlp()
        .fetch_metadata(&body.url)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /tasks
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloadBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let task_id = state
        .orchestrator
        .start(&body.url, body.format_id.as_deref())
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "task_id": task_id })),
    ))
}

/// GET /tasks/:id
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .orchestrator
        .registry()
        .get(&task_id)
        .await
        .map(Json)
        .ok_or_else(|| error_response(GrabberError::NotFound))
}

/// GET /tasks/:id/file
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .orchestrator
        .registry()
        .get(&task_id)
        .await
        .ok_or_else(|| error_response(GrabberError::NotFound))?;

    let file_path = task
        .filename
        .ok_or_else(|| error_response(GrabberError::NotReady))?;

    let size = match tokio::fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return Err(error_response(GrabberError::MissingFile)),
    };

    let file = tokio::fs::File::open(&file_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            error_response(GrabberError::MissingFile)
        } else {
            error_response(GrabberError::Io(e))
        }
    })?;

    let stored_name = std::path::Path::new(&file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let download_name = artifact::display_name(stored_name, &task.id);
    let encoded = urlencoding::encode(download_name);
    let disposition = format!("attachment; filename=\"{0}\"; filename*=UTF-8''{0}", encoded);

    info!("Serving task {} file {} ({} bytes)", task.id, download_name, size);

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(download_name).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        body,
    ))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        "opus" | "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}


#[cfg(all(test, unix))]
mod tool_tests {
    use super::*;
    use axum::http::Request;
    use grabber_downloader::{Orchestrator, YtDlp};
    use grabber_shared::task_registry::TaskRegistry;
    use tower::ServiceExt;

    fn fake_app(dir: &std::path::Path, body: &str) -> Router {
        let script = dir.join("fake-yt-dlp.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        let ytdlp = YtDlp::new("/bin/sh", dir).with_base_args(vec![script.to_string_lossy().to_string()]);
        let state = Arc::new(AppState {
            orchestrator: Orchestrator::new(ytdlp, TaskRegistry::new()),
        });
        router(state, dir)
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_metadata_upstream_failure_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = fake_app(dir.path(), "echo 'ERROR: Unsupported URL' >&2\nexit 1\n");

        let resp = app
            .oneshot(post_json("/metadata", r#"{"url":"https://example.com/nope"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Failed to fetch video info");
        assert_eq!(body["detail"], "ERROR: Unsupported URL");
    }

    #[tokio::test]
    async fn test_metadata_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = fake_app(
            dir.path(),
            "echo '{\"title\":\"Clip\",\"uploader\":\"me\",\"formats\":[{\"format_id\":\"251\",\"ext\":\"webm\",\"protocol\":\"https\",\"vcodec\":\"none\",\"acodec\":\"opus\",\"abr\":300}]}'\n",
        );

        let resp = app
            .oneshot(post_json("/metadata", r#"{"url":"https://example.com/v"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["title"], "Clip");
        assert_eq!(body["formats"][0]["format_id"], "251");
        assert_eq!(body["formats"][0]["note"], "320kbps (High)");
    }

    #[tokio::test]
    async fn test_start_then_poll() {
        let dir = tempfile::tempdir().unwrap();
        let app = fake_app(dir.path(), "exit 0\n");

        let resp = app
            .clone()
            .oneshot(post_json("/tasks", r#"{"url":"https://example.com/v","format_id":"18"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let task_id = json_body(resp).await["task_id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/tasks/{}", task_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["id"], task_id.as_str());
    }
}
