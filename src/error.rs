use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Request errors
    #[error("{0}")]
    InvalidInput(String),
    #[error("Invalid schedule time {hour:02}:{minute:02}: hour must be 0-23 and minute 0-59")]
    InvalidTime { hour: i64, minute: i64 },
    #[error("No valid tokens available to send notifications.")]
    NoRecipients,

    // Schedule errors
    #[error("Schedule not found")]
    ScheduleNotFound,

    // Token store errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Push provider errors
    #[error("Delivery error: {0}")]
    Delivery(String),

    // Scheduler errors
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Storage(format!("malformed token document: {}", e))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Delivery(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Delivery(format!("service account signing failed: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // 400 Bad Request
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidTime { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NoRecipients => (StatusCode::BAD_REQUEST, self.to_string()),

            // 404 Not Found
            AppError::ScheduleNotFound => (StatusCode::NOT_FOUND, self.to_string()),

            // 500 Internal Server Error
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Delivery(e) => {
                tracing::error!("Delivery error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Scheduling(e) => {
                tracing::error!("Scheduling error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
