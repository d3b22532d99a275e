//! Response security headers.
//!
//! # Responsibilities
//! - Stamp baseline headers on every response, error branches included
//! - Add CORS headers to API responses from a static policy
//! - Add `X-RateLimit-*` headers when the limiter asks for them
//!
//! # Design Decisions
//! - Header values are built once at startup; a bad CORS value is a
//!   configuration error, not a request error
//! - Existing values from downstream handlers are overwritten

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, REFERRER_POLICY, VARY,
    X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::validation::ValidationError;
use crate::config::CorsConfig;
use crate::security::rate_limit::RateLimitStatus;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone)]
struct CorsHeaders {
    origin: HeaderValue,
    methods: HeaderValue,
    headers: HeaderValue,
    credentials: bool,
    max_age: HeaderValue,
}

/// Pre-built header set applied as the last step of every gateway branch.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    cors: CorsHeaders,
}

impl SecurityHeaders {
    pub fn new(cors: &CorsConfig) -> Result<Self, ValidationError> {
        let value = |raw: String| {
            HeaderValue::from_str(&raw).map_err(|_| ValidationError::InvalidHeaderValue(raw))
        };

        Ok(Self {
            cors: CorsHeaders {
                origin: value(cors.allowed_origin.clone())?,
                methods: value(cors.allowed_methods.join(", "))?,
                headers: value(cors.allowed_headers.join(", "))?,
                credentials: cors.allow_credentials,
                max_age: HeaderValue::from(cors.max_age_secs),
            },
        })
    }

    /// Baseline headers, always applied.
    pub fn apply_baseline(&self, headers: &mut HeaderMap) {
        headers.insert(X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("on"));
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(
            REFERRER_POLICY,
            HeaderValue::from_static("origin-when-cross-origin"),
        );
    }

    pub fn apply_cors(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.cors.origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.cors.methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.cors.headers.clone());
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.cors.max_age.clone());
        if self.cors.credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if self.cors.origin != "*" {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// `X-RateLimit-Reset` is in whole seconds since the Unix epoch.
    pub fn apply_rate_limit(&self, headers: &mut HeaderMap, status: &RateLimitStatus) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(status.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(status.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(status.reset_at_ms.div_ceil(1000)));
    }

    /// Everything the gateway stamps on a response.
    pub fn apply(
        &self,
        headers: &mut HeaderMap,
        cors_eligible: bool,
        rate_limit: Option<&RateLimitStatus>,
    ) {
        self.apply_baseline(headers);
        if cors_eligible {
            self.apply_cors(headers);
        }
        if let Some(status) = rate_limit.filter(|s| s.standard_headers) {
            self.apply_rate_limit(headers, status);
        }
    }
}
