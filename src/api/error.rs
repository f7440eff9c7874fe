//! Bridges [`CoreError`] to HTTP responses.

use crate::error::CoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// HTTP-facing error: a status, a machine-readable code, and a
/// human-readable message. Store detail never crosses this boundary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, code) = match &err {
            CoreError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CoreError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            CoreError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            CoreError::SalesWindowClosed => (StatusCode::CONFLICT, "SALES_WINDOW_CLOSED"),
            CoreError::LimitExceeded { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "LIMIT_EXCEEDED"),
            CoreError::InsufficientInventory { .. } => {
                (StatusCode::CONFLICT, "INSUFFICIENT_INVENTORY")
            }
            CoreError::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            CoreError::Store { .. } | CoreError::Serialization { .. } => {
                // Internal detail stays in the logs.
                tracing::error!(error = %err, "store failure surfaced to HTTP boundary");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "INTERNAL_ERROR",
                    message: "An internal error occurred".to_string(),
                };
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
