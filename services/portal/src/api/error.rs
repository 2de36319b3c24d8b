//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error response construction so every endpoint returns
//! the same `{code, message}` envelope, and maps store failures onto the
//! right status codes: NotFound→404, Conflict→409, Unavailable→503,
//! Unexpected→500. Internal errors log details server-side and return a
//! generic message.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn build(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

/// 404 Not Found.
pub fn api_not_found(message: &str) -> ApiError {
    build(StatusCode::NOT_FOUND, "not_found", message)
}

/// 409 Conflict with a caller-provided code for precise client handling.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    build(StatusCode::CONFLICT, code, message)
}

/// 400 Bad Request for input that failed validation.
pub fn api_validation_error(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 401 Unauthorized: authentication missing or failed.
pub fn api_unauthorized(message: &str) -> ApiError {
    build(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// 403 Forbidden: authenticated but not allowed.
pub fn api_forbidden(message: &str) -> ApiError {
    build(StatusCode::FORBIDDEN, "forbidden", message)
}

/// 503 Service Unavailable: the backing store is transiently unreachable.
pub fn api_unavailable(message: &str) -> ApiError {
    build(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
}

/// 500 Internal Server Error from a store failure. Logs details server-side
/// and returns the generic message only.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "portal storage error");
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// 500 Internal Server Error without a concrete store error to log.
pub fn api_internal_message(message: &str) -> ApiError {
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Default mapping from a store failure. Call sites that need a different
/// conflict code or message match on [`StoreError`] themselves.
pub fn api_store_error(context: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(message) => api_not_found(&message),
        // Conflict details (e.g. the duplicate channel name) surface
        // verbatim to the caller.
        StoreError::Conflict(message) => api_conflict("already_exists", &message),
        StoreError::Unavailable(message) => {
            tracing::warn!(%message, "portal storage unavailable");
            api_unavailable(context)
        }
        err @ StoreError::Unexpected(_) => api_internal(context, &err),
    }
}
