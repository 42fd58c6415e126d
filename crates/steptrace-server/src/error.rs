//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes.
//!
//! A traced program that fails is *not* an `ApiError`: compile errors and
//! runtime faults are part of the Trace, which is returned with `200`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "BAD_REQUEST", "TIMEOUT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The trace did not finish before its deadline (504).
    #[error("execution exceeded the {seconds}s deadline")]
    Timeout { seconds: u64 },

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorDetail {
                    code: "BAD_REQUEST".to_string(),
                    message: msg.clone(),
                    details: None,
                },
            ),
            ApiError::Timeout { seconds } => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorDetail {
                    code: "TIMEOUT".to_string(),
                    message: self.to_string(),
                    details: Some(serde_json::json!({ "timeout_secs": seconds })),
                },
            ),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    details: None,
                },
            ),
        };

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::InternalError(format!("worker I/O failed: {err}"))
    }
}
