use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        FromRequest,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::document::renderer::RenderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Completion service returned malformed content: {0}")]
    UpstreamMalformed(String),

    #[error("Completion service is rate limiting requests: {0}")]
    UpstreamRateLimited(String),

    #[error("Completion service quota exceeded: {0}")]
    UpstreamQuotaExceeded(String),

    #[error("Request did not complete within {0}s")]
    ServiceTimeout(u64),

    #[error("Rendering error: {0}")]
    Rendering(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamRateLimited(_) | AppError::ServiceTimeout(_)
        )
    }
}

/// Malformed, mistyped or non-JSON bodies are caller errors like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(format!("Invalid multipart body: {}", rejection.body_text()))
    }
}

/// `axum::Json` with its rejections reported through `AppError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UpstreamMalformed(msg) => {
                tracing::error!("Malformed completion output: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_MALFORMED",
                    "The AI service returned content that could not be used".to_string(),
                )
            }
            AppError::UpstreamRateLimited(msg) => {
                tracing::error!("Completion rate limited after retry: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UPSTREAM_RATE_LIMITED",
                    "The AI service is busy, please try again shortly".to_string(),
                )
            }
            AppError::UpstreamQuotaExceeded(msg) => {
                tracing::error!("Completion quota exceeded: {msg}");
                (
                    StatusCode::PAYMENT_REQUIRED,
                    "UPSTREAM_QUOTA_EXCEEDED",
                    "The AI service quota has been exhausted".to_string(),
                )
            }
            AppError::ServiceTimeout(secs) => {
                tracing::error!("Pipeline timed out after {secs}s");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "SERVICE_TIMEOUT",
                    format!("The request did not complete within {secs} seconds"),
                )
            }
            AppError::Rendering(e) => {
                tracing::error!("Rendering error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDERING_ERROR",
                    "The document could not be rendered".to_string(),
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
                "message": message,
                "retryable": retryable
            }
        }));

        (status, body).into_response()
    }
}
