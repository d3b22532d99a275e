//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing rate-limit buckets)
//! - Validate value ranges (windows and maxima > 0, secret length)
//! - Check the permission table covers the closed role set
//! - Check the declared pipeline order is sound
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{BTreeMap, HashSet};

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, KeyStrategy, RateLimitConfig};
use crate::gateway::StageKind;
use crate::rbac::{PermissionTable, Role};
use crate::security::headers::SecurityHeaders;

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identity.secret is not set")]
    MissingSecret,

    #[error("identity.secret is {len} bytes, at least {} required", MIN_SECRET_LEN)]
    WeakSecret { len: usize },

    #[error("route pattern `{0}` must start with `/`")]
    InvalidPattern(String),

    #[error("route pattern `{0}` is declared more than once")]
    DuplicatePattern(String),

    #[error("route `{pattern}` references unknown rate limit `{bucket}`")]
    UnknownRateLimitBucket { pattern: String, bucket: String },

    #[error("rate limit `{name}`: {reason}")]
    InvalidRateLimit { name: String, reason: &'static str },

    #[error("route `{0}` is public but lists required permissions")]
    PermissionsOnPublicZone(String),

    #[error("unknown role `{0}` in permissions table")]
    UnknownRole(String),

    #[error("permissions table has no entry for {0:?}")]
    IncompletePermissionTable(Vec<Role>),

    #[error("pipeline stage `{0}` must come after `authenticate`")]
    StageBeforeAuthenticate(StageKind),

    #[error("pipeline stage `{0}` is declared more than once")]
    DuplicateStage(StageKind),

    #[error("pipeline is missing required stage `{0}`")]
    MissingStage(StageKind),

    #[error("user_rate_limit must key on identity, not IP alone")]
    UserLimiterKeyedByIp,

    #[error("cors.allowed_origin `*` cannot be combined with credentials")]
    CorsWildcardWithCredentials,

    #[error("routing.api_prefix `{0}` must start with `/` and not be `/`")]
    InvalidApiPrefix(String),

    #[error("redirect target `{0}` must be a site-relative path")]
    InvalidRedirect(String),

    #[error("upstream.url `{0}` is not a valid http URL")]
    InvalidUpstream(String),

    #[error("`{0}` is not a valid header value")]
    InvalidHeaderValue(String),
}

/// Validate the entire configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_secret(config, &mut errors);
    validate_routes(config, &mut errors);
    validate_rate_limits(config, &mut errors);
    if let Err(mut table_errors) = permission_entries(config) {
        errors.append(&mut table_errors);
    }
    validate_pipeline(&config.pipeline.order, &mut errors);
    validate_surface(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse the `permissions` section into the closed role set and check it is
/// complete.
pub fn permission_entries(
    config: &GatewayConfig,
) -> Result<BTreeMap<Role, Vec<String>>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut entries = BTreeMap::new();

    for (name, perms) in &config.permissions {
        match name.parse::<Role>() {
            Ok(role) => {
                entries.insert(role, perms.clone());
            }
            Err(_) => errors.push(ValidationError::UnknownRole(name.clone())),
        }
    }

    if let Err(e) = PermissionTable::new(&entries) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(errors)
    }
}

fn validate_secret(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let len = config.identity.secret.len();
    if len == 0 {
        errors.push(ValidationError::MissingSecret);
    } else if len < MIN_SECRET_LEN {
        errors.push(ValidationError::WeakSecret { len });
    }
}

fn validate_routes(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for route in &config.routes {
        if !route.pattern.starts_with('/') {
            errors.push(ValidationError::InvalidPattern(route.pattern.clone()));
            continue;
        }

        let normalized = match route.pattern.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        if !seen.insert(normalized.to_string()) {
            errors.push(ValidationError::DuplicatePattern(route.pattern.clone()));
        }

        if route.zone.is_public() && !route.required_permissions.is_empty() {
            errors.push(ValidationError::PermissionsOnPublicZone(route.pattern.clone()));
        }

        if let Some(bucket) = &route.rate_limit {
            if !config.rate_limits.contains_key(bucket) {
                errors.push(ValidationError::UnknownRateLimitBucket {
                    pattern: route.pattern.clone(),
                    bucket: bucket.clone(),
                });
            }
        }
    }
}

fn validate_rate_limits(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let named = config
        .rate_limits
        .iter()
        .map(|(name, limit)| (name.as_str(), limit));
    let all = [
        ("rate_limit", &config.rate_limit),
        ("user_rate_limit", &config.user_rate_limit),
    ]
    .into_iter()
    .chain(named);

    for (name, limit) in all {
        check_limit(name, limit, errors);
    }

    if config.user_rate_limit.enabled && config.user_rate_limit.key == KeyStrategy::Ip {
        errors.push(ValidationError::UserLimiterKeyedByIp);
    }
}

fn check_limit(name: &str, limit: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
    if !limit.enabled {
        return;
    }
    if limit.window_ms == 0 {
        errors.push(ValidationError::InvalidRateLimit {
            name: name.to_string(),
            reason: "window_ms must be greater than zero",
        });
    }
    if limit.max == 0 {
        errors.push(ValidationError::InvalidRateLimit {
            name: name.to_string(),
            reason: "max must be greater than zero",
        });
    }
}

/// Order rules for the stages that follow classification.
pub fn validate_pipeline(order: &[StageKind], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for stage in order {
        if !seen.insert(*stage) {
            errors.push(ValidationError::DuplicateStage(*stage));
        }
    }

    for required in [StageKind::Authenticate, StageKind::Authorize] {
        if !seen.contains(&required) {
            errors.push(ValidationError::MissingStage(required));
        }
    }

    if let Some(auth_at) = order.iter().position(|s| *s == StageKind::Authenticate) {
        for (i, stage) in order.iter().enumerate() {
            if stage.needs_identity() && i < auth_at {
                errors.push(ValidationError::StageBeforeAuthenticate(*stage));
            }
        }
    }
}

fn validate_surface(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let prefix = &config.routing.api_prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::InvalidApiPrefix(prefix.clone()));
    }

    if config.cors.allowed_origin == "*" && config.cors.allow_credentials {
        errors.push(ValidationError::CorsWildcardWithCredentials);
    }
    if let Err(e) = SecurityHeaders::new(&config.cors) {
        errors.push(e);
    }

    let redirects = [
        &config.redirects.signin,
        &config.redirects.dashboard,
        &config.redirects.verify_email,
    ];
    for target in redirects {
        let renderable = HeaderValue::from_str(target).is_ok();
        if !renderable || !target.starts_with('/') || target.starts_with("//") {
            errors.push(ValidationError::InvalidRedirect(target.clone()));
        }
    }

    if let Some(upstream) = &config.upstream.url {
        let valid = url::Url::parse(upstream)
            .map(|u| u.scheme() == "http" && u.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidUpstream(upstream.clone()));
        }
    }
}
