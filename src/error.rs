//! Gateway error taxonomy.
//!
//! # Propagation
//! - `AuthenticationMissing` / `AuthorizationDenied`: redirect on page zones,
//!   JSON 401/403 on API zones
//! - `MalformedPath`: JSON 400 in every zone, before any stage runs
//! - `RateLimitExceeded`: always JSON 429 with a reset hint
//! - `Configuration`: fatal, surfaced at startup only
//!
//! Credential *verification* failures never show up here; the identity
//! resolver turns them into "no identity".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::config::loader::ConfigError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication required")]
    AuthenticationMissing,

    #[error("insufficient permissions")]
    AuthorizationDenied,

    #[error("request path is not in canonical form")]
    MalformedPath,

    #[error("rate limit exceeded, window resets at {reset_at_ms}ms")]
    RateLimitExceeded { reset_at_ms: u64 },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Issuing (not verifying) a credential failed.
    #[error("credential encoding failed: {0}")]
    Credential(#[from] jsonwebtoken::errors::Error),
}

impl GatewayError {
    /// HTTP status used when the error is rendered as a JSON body.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationMissing => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationDenied => StatusCode::FORBIDDEN,
            GatewayError::MalformedPath => StatusCode::BAD_REQUEST,
            GatewayError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Configuration(_) | GatewayError::Credential(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the `{"error": ...}` body. Internal failures are
    /// not described to clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationMissing => "Authentication required",
            GatewayError::AuthorizationDenied => "Insufficient permissions",
            GatewayError::MalformedPath => "Malformed request path",
            GatewayError::RateLimitExceeded { .. } => "Too many requests, please try again later.",
            GatewayError::Configuration(_) | GatewayError::Credential(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if matches!(self, GatewayError::Configuration(_) | GatewayError::Credential(_)) {
            tracing::error!(error = %self, "Internal gateway error");
        }
        json_error(self.status(), self.public_message())
    }
}

/// `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::AuthenticationMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::AuthorizationDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatewayError::RateLimitExceeded { reset_at_ms: 0 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_rate_limit_message() {
        let err = GatewayError::RateLimitExceeded { reset_at_ms: 60_000 };
        assert!(err.public_message().starts_with("Too many requests"));
    }
}
