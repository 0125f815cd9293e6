use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream API failure. `transient` marks failures worth retrying
    /// (transport errors, 5xx responses).
    #[error("External service error: {message}")]
    ExternalServiceError { message: String, transient: bool },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Upstream failure that a retry will not fix (bad payload, 4xx).
    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::ExternalServiceError {
            message: message.into(),
            transient: false,
        }
    }

    /// Upstream failure that may succeed on retry.
    pub fn upstream_transient(message: impl Into<String>) -> Self {
        AppError::ExternalServiceError {
            message: message.into(),
            transient: true,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ExternalServiceError {
                transient: true,
                ..
            }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalServiceError { message, .. } => {
                tracing::error!("Upstream error: {}", message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::upstream("x"), StatusCode::BAD_GATEWAY),
            (
                AppError::InternalError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_transient_flag() {
        assert!(AppError::upstream_transient("timeout").is_transient());
        assert!(!AppError::upstream("bad json").is_transient());
        assert!(!AppError::NotFound("gone".into()).is_transient());
    }
}
