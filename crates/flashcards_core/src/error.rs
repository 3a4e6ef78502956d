//! crates/flashcards_core/src/error.rs
//!
//! The error taxonomy surfaced by the core services to their callers.

use crate::ports::{PortError, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing, invalid or expired credential, or the principal no longer exists.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Daily generation limit reached ({generated_today}/{daily_limit})")]
    QuotaExceeded {
        generated_today: u32,
        daily_limit: u32,
        remaining: u32,
    },

    #[error("Generation provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered but none of its pairs survived validation.
    #[error("Generation provider produced no usable flashcards")]
    InvalidOutput,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ServiceError::NotFound(what),
            PortError::Conflict(what) => ServiceError::Conflict(what),
            PortError::Unauthorized => ServiceError::Unauthorized,
            PortError::Unexpected(detail) => ServiceError::Internal(detail),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
