/// JSON error bodies for API handlers.
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use grabber_shared::errors::GrabberError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Map a request-time error to its status code and body.
pub fn error_response(err: GrabberError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!("Request failed: {}", err);
    }
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
            detail: err.detail().map(String::from),
        }),
    )
}
