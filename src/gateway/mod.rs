//! Request authorization gateway.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → request.rs (GatewayRequest: method, path, client IP, credential)
//!     → pipeline.rs
//!         classify (routing)
//!         → stages in declared order (rate limits, authenticate, authorize)
//!         → decision.rs (pure decision engine)
//!     → Outcome { action, zone, identity, rate_limit }
//!     → middleware.rs (pass downstream or render the action)
//!     → SecurityHeaders stamped on every branch
//! ```
//!
//! # Design Decisions
//! - The gateway is built once from a validated config and shared via `Arc`
//! - All limiters share one counter store; buckets keep their keys apart
//! - Denials are written to the violation log through `on_limit_reached`

pub mod decision;
pub mod middleware;
pub mod pipeline;
pub mod request;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::config::validation::permission_entries;
use crate::config::{validate_config, ConfigError, GatewayConfig, RateLimitConfig};
use crate::error::json_error;
use crate::identity::IdentityResolver;
use crate::rbac::PermissionTable;
use crate::routing::RouteClassifier;
use crate::security::headers::X_RATELIMIT_RESET;
use crate::security::{
    CounterStore, InMemoryCounterStore, LimitReached, RateLimiter, SecurityHeaders, ViolationLog,
    ViolationRecord,
};

pub use decision::{decide, Action, DecisionInput};
pub use middleware::gateway_middleware;
pub use pipeline::{
    AuthenticateStage, AuthorizeStage, Flow, GatewayContext, Outcome, Pipeline, RateLimitStage,
    RouteRateLimitStage, Stage, StageKind,
};
pub use request::{GatewayRequest, RequestOptions};

/// Compiled gateway: classifier, limiters, resolver, and decision engine.
pub struct Gateway {
    config: GatewayConfig,
    pipeline: Pipeline,
    request_options: RequestOptions,
    headers: SecurityHeaders,
    permissions: Arc<PermissionTable>,
    counters: Arc<dyn CounterStore>,
    violations: Arc<ViolationLog>,
}

impl Gateway {
    /// Validate the config and build a gateway over an in-memory counter store.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_store(config, Arc::new(InMemoryCounterStore::new()))
    }

    /// Same as [`Gateway::from_config`] with a caller-supplied counter store.
    pub fn with_store(
        config: &GatewayConfig,
        counters: Arc<dyn CounterStore>,
    ) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let entries = permission_entries(config).map_err(ConfigError::Validation)?;
        let permissions = Arc::new(
            PermissionTable::new(&entries).map_err(|e| ConfigError::Validation(vec![e]))?,
        );
        let headers =
            SecurityHeaders::new(&config.cors).map_err(|e| ConfigError::Validation(vec![e]))?;
        let violations = Arc::new(ViolationLog::new(config.monitoring.max_violations));

        let builder = StageBuilder {
            config,
            counters: &counters,
            violations: &violations,
        };
        let stages = config
            .pipeline
            .order
            .iter()
            .filter_map(|kind| builder.build(*kind, &permissions))
            .collect();

        let classifier = Arc::new(RouteClassifier::from_config(
            &config.routes,
            &config.routing.api_prefix,
        ));
        let pipeline = Pipeline::new(classifier, stages);

        tracing::info!(
            routes = config.routes.len(),
            stages = ?pipeline.stage_order(),
            "Gateway initialized"
        );

        Ok(Self {
            config: config.clone(),
            pipeline,
            request_options: RequestOptions {
                cookie_name: config.identity.cookie_name.clone(),
                trust_forwarded_for: config.listener.trust_forwarded_for,
            },
            headers,
            permissions,
            counters,
            violations,
        })
    }

    pub fn evaluate(&self, request: &GatewayRequest, now_ms: u64) -> Outcome {
        self.pipeline.run(request, now_ms)
    }

    pub fn request_from_http<B>(&self, request: &axum::http::Request<B>) -> GatewayRequest {
        GatewayRequest::from_http(request, &self.request_options)
    }

    /// Render a terminal action. `None` means the request passes downstream.
    pub fn action_response(&self, action: &Action, now_ms: u64) -> Option<Response> {
        match action {
            Action::Pass => None,
            Action::Redirect(target) => Some(Redirect::temporary(target).into_response()),
            Action::Preflight => Some(StatusCode::NO_CONTENT.into_response()),
            Action::JsonError {
                status,
                message,
                reset_at_ms,
            } => {
                let mut response = json_error(*status, message);
                if let Some(reset_at_ms) = reset_at_ms {
                    let headers = response.headers_mut();
                    let retry_after = reset_at_ms.saturating_sub(now_ms).div_ceil(1000);
                    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at_ms.div_ceil(1000)));
                }
                Some(response)
            }
        }
    }

    /// Security headers for the final response of any branch.
    pub fn stamp(&self, headers: &mut HeaderMap, outcome: &Outcome) {
        self.headers
            .apply(headers, outcome.zone.is_api(), outcome.rate_limit.as_ref());
    }

    /// Drop every violation record and counter. Returns `(records, counters)`.
    pub fn reset(&self) -> (usize, usize) {
        let records = self.violations.clear();
        let counters = self.counters.reset_all();
        tracing::info!(records, counters, "Rate limit state reset");
        (records, counters)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn violations(&self) -> &ViolationLog {
        &self.violations
    }

    pub fn counters(&self) -> &Arc<dyn CounterStore> {
        &self.counters
    }
}

struct StageBuilder<'a> {
    config: &'a GatewayConfig,
    counters: &'a Arc<dyn CounterStore>,
    violations: &'a Arc<ViolationLog>,
}

impl StageBuilder<'_> {
    fn build(&self, kind: StageKind, permissions: &Arc<PermissionTable>) -> Option<Box<dyn Stage>> {
        let config = self.config;
        match kind {
            StageKind::RateLimit => self
                .limiter("global", &config.rate_limit)
                .map(|l| Box::new(RateLimitStage::global(l)) as Box<dyn Stage>),
            StageKind::UserRateLimit => self
                .limiter("user", &config.user_rate_limit)
                .map(|l| Box::new(RateLimitStage::per_user(l)) as Box<dyn Stage>),
            StageKind::RouteRateLimit => {
                let limiters: HashMap<String, Arc<RateLimiter>> = config
                    .rate_limits
                    .iter()
                    .filter_map(|(name, limit)| Some((name.clone(), self.limiter(name, limit)?)))
                    .collect();
                if limiters.is_empty() {
                    None
                } else {
                    Some(Box::new(RouteRateLimitStage::new(limiters)))
                }
            }
            StageKind::Authenticate => Some(Box::new(AuthenticateStage::new(Arc::new(
                IdentityResolver::new(&config.identity.secret, config.identity.leeway_secs),
            )))),
            StageKind::Authorize => Some(Box::new(AuthorizeStage::new(
                permissions.clone(),
                config.redirects.clone(),
            ))),
        }
    }

    fn limiter(&self, bucket: &str, limit: &RateLimitConfig) -> Option<Arc<RateLimiter>> {
        if !limit.enabled {
            return None;
        }
        let violations = self.violations.clone();
        let limiter = RateLimiter::new(bucket, limit, self.counters.clone()).on_limit_reached(
            Arc::new(move |event: &LimitReached<'_>| {
                violations.record(ViolationRecord::from_event(event));
            }),
        );
        Some(Arc::new(limiter))
    }
}
