//! Service error taxonomy
//!
//! Business-rule violations (`NotFound`, `InsufficientStock`,
//! `InvalidState`, `InvalidArgument`) are expected, user-facing
//! outcomes and propagate unchanged to the caller. `Storage` failures
//! abort the whole operation with no partial effect and are the only
//! class eligible for caller-driven retry (safe because completion and
//! merge are idempotent or precondition-checked).

use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the hall services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Only storage failures are worth retrying; business errors are
    /// final until the caller changes the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Storage(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
