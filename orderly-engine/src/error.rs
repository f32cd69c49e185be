//! Engine error types.
//!
//! Every failure an engine reports falls into one of five kinds; the
//! transport maps kinds to status codes.

use orderly_domain::DomainError;
use orderly_store::StoreError;
use thiserror::Error;
use tracing::error;

/// Errors returned by the auth and order engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or invariant-violating request
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, invalid or expired credentials or token
    #[error("{0}")]
    Unauthorized(String),

    /// Referenced entity is absent
    #[error("{0}")]
    NotFound(String),

    /// State machine violation or duplicate registration
    #[error("{0}")]
    Conflict(String),

    /// Unexpected store or infrastructure failure
    #[error("{0}")]
    Internal(String),
}

/// Failure category, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request
    InvalidInput,
    /// Authentication failure
    Unauthorized,
    /// Missing entity
    NotFound,
    /// Conflict with current state
    Conflict,
    /// Server-side failure
    Internal,
}

impl EngineError {
    /// Get the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::Unauthorized(_) => ErrorKind::Unauthorized,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap a store failure as `Internal`, logging the cause.
    pub(crate) fn store(operation: &'static str, err: StoreError) -> Self {
        error!(operation, error = %err, "Store failure");
        EngineError::Internal(format!("{}: {}", operation, err))
    }
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        if err.is_conflict() {
            EngineError::Conflict(err.to_string())
        } else {
            EngineError::InvalidInput(err.to_string())
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
