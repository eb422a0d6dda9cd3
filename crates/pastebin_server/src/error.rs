//! HTTP error mapping for API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pastebin_core::AppError;
use serde_json::json;

/// Handler error carrying a core [`AppError`].
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl HttpError {
    /// Status code and client-facing message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            AppError::ContentRequired | AppError::QueryRequired | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            err if err.is_storage_failure() => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage temporarily unavailable".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
