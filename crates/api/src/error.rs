//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Business or not-found outcome from the engine.
    Domain(DomainError),
    /// Missing, malformed, or expired credentials.
    Unauthorized(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Invalid(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::EmailTaken(_) => (StatusCode::CONFLICT, err.to_string()),
        DomainError::NotOpen { .. } | DomainError::AlreadyClosed => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::InsufficientStock { .. }
        | DomainError::ProductReferenced { .. }
        | DomainError::CustomerHasOrders { .. }
        | DomainError::SelfModification { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        DomainError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
        DomainError::Store(inner) => {
            // Persistence faults are never surfaced verbatim.
            tracing::error!(error = %inner, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
