use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Request-handling failures, mapped to HTTP status codes the way
/// Malformed input is a 400; everything else downstream is a 500.
#[derive(Debug)]
pub enum WebhookError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl From<custody_ingest::IngestError> for WebhookError {
    fn from(e: custody_ingest::IngestError) -> Self {
        WebhookError::Internal(e.to_string())
    }
}

impl From<custody_attest_client::AttestError> for WebhookError {
    fn from(e: custody_attest_client::AttestError) -> Self {
        WebhookError::Internal(e.to_string())
    }
}

impl From<anyhow::Error> for WebhookError {
    fn from(e: anyhow::Error) -> Self {
        WebhookError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for WebhookError {
    fn from(e: std::io::Error) -> Self {
        WebhookError::Internal(e.to_string())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebhookError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            WebhookError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            WebhookError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
