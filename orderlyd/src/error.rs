//! Daemon error types and the HTTP error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderly_engine::{EngineError, ErrorKind};

use crate::config::Environment;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Database lifecycle error (connect, migrate)
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server I/O error (bind, serve)
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

// =============================================================================
// HTTP errors
// =============================================================================

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Client-facing message
    pub error: String,
    /// Debug rendering of the failure, omitted in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// An error ready to be written as `{error, stack?}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    stack: Option<String>,
}

impl ApiError {
    /// Create an error with no diagnostic detail.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stack: None,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Map an engine failure to its status code.
    ///
    /// Internal failures are masked in production.
    pub fn from_engine(err: EngineError, environment: Environment) -> Self {
        let status = status_for(err.kind());
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR && !environment.exposes_errors() {
            INTERNAL_MESSAGE.to_string()
        } else {
            err.to_string()
        };

        Self::new(status, message).with_stack(environment, format!("{:?}", err))
    }

    /// Attach diagnostic detail, unless running in production.
    pub fn with_stack(mut self, environment: Environment, stack: String) -> Self {
        if environment.exposes_errors() {
            self.stack = Some(stack);
        }
        self
    }

    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            stack: self.stack,
        };
        (self.status, Json(body)).into_response()
    }
}
