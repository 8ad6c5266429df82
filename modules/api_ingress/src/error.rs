use axum::{
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::request_id;

/// Error body for failures raised by the ingress itself (unknown routes).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
    /// HTTP status code
    pub code: u16,
    /// RFC3339 timestamp when the error occurred
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Router fallback.
pub async fn not_found(uri: Uri, headers: HeaderMap) -> ErrorResponse {
    tracing::debug!(path = %uri.path(), "No route matched");
    let body = ErrorResponse::new(
        format!("No route for {}", uri.path()),
        StatusCode::NOT_FOUND.as_u16(),
    );
    match request_id::from_headers(&headers) {
        Some(rid) => body.with_request_id(rid),
        None => body,
    }
}
