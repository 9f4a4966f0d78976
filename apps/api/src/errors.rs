use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::AiError;
use crate::matching::batch::BatchError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("Persistence error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Rejected { status: 401, .. } => AppError::Unauthorized,
            StoreError::Rejected { message, .. } => AppError::Validation(message),
            other => AppError::Store(other),
        }
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Configuration(e) => AppError::Ai(e),
            BatchError::AlreadyRunning => {
                AppError::Conflict("A batch analysis is already running".to_string())
            }
            BatchError::JobNotFound(_) => AppError::NotFound(err.to_string()),
            BatchError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Sign in required".to_string(),
            ),
            AppError::Ai(AiError::MissingCredential) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI_NOT_CONFIGURED",
                AiError::MissingCredential.to_string(),
            ),
            AppError::Ai(AiError::RateLimited { .. }) => (
                StatusCode::TOO_MANY_REQUESTS,
                "AI_QUOTA_EXCEEDED",
                "AI provider quota exceeded. Please wait or use a different API key.".to_string(),
            ),
            AppError::Ai(e) => {
                tracing::error!("AI error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PERSISTENCE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
