//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flashcards_core::ports::PortError;
use flashcards_core::ServiceError;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error raised by one of the core services.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request body failed validation before reaching a service.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String, Option<serde_json::Value>) {
        match self {
            ApiError::Service(service) => match service {
                ServiceError::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "Authentication required".into(), None)
                }
                ServiceError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, format!("{} not found", what), None)
                }
                ServiceError::Conflict(what) => (StatusCode::CONFLICT, what.clone(), None),
                ServiceError::QuotaExceeded {
                    generated_today,
                    daily_limit,
                    remaining,
                } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Daily generation limit reached".into(),
                    Some(json!({
                        "generated_today": generated_today,
                        "daily_limit": daily_limit,
                        "remaining": remaining,
                    })),
                ),
                ServiceError::Provider(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Flashcard generation failed, please try again".into(),
                    None,
                ),
                ServiceError::InvalidOutput => (
                    StatusCode::BAD_GATEWAY,
                    "The generator did not produce any usable flashcards".into(),
                    None,
                ),
                ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
                ServiceError::Internal(_) => internal(),
            },
            ApiError::Port(PortError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{} not found", what), None)
            }
            ApiError::Port(PortError::Conflict(what)) => (StatusCode::CONFLICT, what.clone(), None),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Authentication required".into(), None)
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            _ => internal(),
        }
    }
}

fn internal() -> (StatusCode, String, Option<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
        None,
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let mut body = json!({ "success": false, "message": message });
        if let Some(details) = details {
            body["details"] = details;
        }
        (status, Json(body)).into_response()
    }
}
