//! Access gate for protected routes.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it, and injects
//! [`CurrentUser`] into request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use orderly_domain::UserId;
use orderly_store::Store;

use crate::api::ApiState;
use crate::error::ApiError;

/// Authenticated caller, available to handlers behind the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

/// Why a request was turned away at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// No `Authorization` header
    Missing,
    /// Header is not `Bearer <token>`
    Malformed,
    /// Token failed verification
    InvalidToken,
}

impl GateRejection {
    /// Client-facing message.
    pub fn message(self) -> &'static str {
        match self {
            GateRejection::Missing => "Authorization header missing",
            GateRejection::Malformed => "Invalid authorization format",
            GateRejection::InvalidToken => "Invalid or expired token",
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme must be exactly `Bearer`, followed by one space and a non-empty token.
pub fn extract_bearer(header: &str) -> Result<&str, GateRejection> {
    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Ok(token),
        _ => Err(GateRejection::Malformed),
    }
}

/// Middleware: require a valid bearer token.
pub async fn require_auth<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| reject(GateRejection::Malformed, &req))?,
        None => return Err(reject(GateRejection::Missing, &req)),
    };

    let token = extract_bearer(header).map_err(|r| reject(r, &req))?;

    match state.auth.verify_token(token) {
        Ok(user_id) => {
            req.extensions_mut().insert(CurrentUser(user_id));
            Ok(next.run(req).await)
        },
        Err(e) => {
            warn!(uri = %req.uri(), reason = %e, "Token rejected");
            Err(ApiError::unauthorized(GateRejection::InvalidToken.message()))
        },
    }
}

fn reject(rejection: GateRejection, req: &Request) -> ApiError {
    warn!(uri = %req.uri(), ?rejection, "Request rejected at gate");
    ApiError::unauthorized(rejection.message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer("Bearer "), Err(GateRejection::Malformed));
        assert_eq!(extract_bearer("Bearer"), Err(GateRejection::Malformed));
        assert_eq!(extract_bearer("bearer abc"), Err(GateRejection::Malformed));
        assert_eq!(extract_bearer("Basic dXNlcjpwdw=="), Err(GateRejection::Malformed));
        assert_eq!(extract_bearer("abc"), Err(GateRejection::Malformed));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(GateRejection::Missing.message(), "Authorization header missing");
        assert_eq!(GateRejection::Malformed.message(), "Invalid authorization format");
        assert_eq!(GateRejection::InvalidToken.message(), "Invalid or expired token");
    }
}
