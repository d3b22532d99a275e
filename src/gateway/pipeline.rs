//! Ordered gateway pipeline.
//!
//! Classification always runs first. The remaining stages run in the order
//! declared in `[pipeline]`; the first `Terminate` wins.
//!
//! Non-canonical paths are refused before any stage. CORS preflights run
//! only the identity-independent limiters, then answer 204.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::config::RedirectConfig;
use crate::gateway::decision::{decide, Action, DecisionInput};
use crate::error::GatewayError;
use crate::gateway::GatewayRequest;
use crate::identity::{Identity, IdentityResolver};
use crate::rbac::PermissionTable;
use crate::routing::{check_canonical, Classification, RouteClassifier, Zone};
use crate::security::{RateLimitStatus, RateLimiter};

/// Configurable stages that follow classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    RateLimit,
    Authenticate,
    UserRateLimit,
    RouteRateLimit,
    Authorize,
}

impl StageKind {
    pub const DEFAULT_ORDER: [StageKind; 5] = [
        StageKind::RateLimit,
        StageKind::Authenticate,
        StageKind::UserRateLimit,
        StageKind::RouteRateLimit,
        StageKind::Authorize,
    ];

    /// Stages that read the resolved identity.
    pub fn needs_identity(&self) -> bool {
        matches!(self, StageKind::UserRateLimit | StageKind::Authorize)
    }

    /// Limiters that do not depend on identity. CORS preflights still count
    /// against these.
    pub fn limits_anonymous(&self) -> bool {
        matches!(self, StageKind::RateLimit | StageKind::RouteRateLimit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::RateLimit => "rate_limit",
            StageKind::Authenticate => "authenticate",
            StageKind::UserRateLimit => "user_rate_limit",
            StageKind::RouteRateLimit => "route_rate_limit",
            StageKind::Authorize => "authorize",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request state threaded through the stages.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub now_ms: u64,
    pub classification: Classification,
    pub identity: Option<Identity>,
    /// Status reported in `X-RateLimit-*` headers.
    pub rate_limit: Option<RateLimitStatus>,
}

impl GatewayContext {
    pub fn new(classification: Classification, now_ms: u64) -> Self {
        Self {
            now_ms,
            classification,
            identity: None,
            rate_limit: None,
        }
    }

    pub fn zone(&self) -> Zone {
        self.classification.zone
    }

    /// Keep the most restrictive status among limiters that publish headers.
    fn observe_rate_limit(&mut self, status: RateLimitStatus) {
        if !status.standard_headers && status.allowed {
            return;
        }
        let replace = match &self.rate_limit {
            None => true,
            Some(current) => {
                (current.allowed && !status.allowed) || status.remaining < current.remaining
            }
        };
        if replace {
            self.rate_limit = Some(status);
        }
    }
}

pub enum Flow {
    Continue,
    Terminate(Action),
}

/// One step of the gateway.
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn evaluate(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Flow;
}

fn limit_flow(status: Option<RateLimitStatus>, ctx: &mut GatewayContext) -> Flow {
    match status {
        Some(status) => {
            ctx.observe_rate_limit(status);
            if status.allowed {
                Flow::Continue
            } else {
                Flow::Terminate(Action::rate_limited(&status))
            }
        }
        None => Flow::Continue,
    }
}

/// Global limiter, or the per-user limiter layered on top of it.
pub struct RateLimitStage {
    kind: StageKind,
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn global(limiter: Arc<RateLimiter>) -> Self {
        Self {
            kind: StageKind::RateLimit,
            limiter,
        }
    }

    /// Applies to authenticated callers only.
    pub fn per_user(limiter: Arc<RateLimiter>) -> Self {
        Self {
            kind: StageKind::UserRateLimit,
            limiter,
        }
    }
}

impl Stage for RateLimitStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn evaluate(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Flow {
        if self.kind == StageKind::UserRateLimit && ctx.identity.is_none() {
            return Flow::Continue;
        }
        let status = self.limiter.check(request, ctx.identity.as_ref(), ctx.now_ms);
        limit_flow(status, ctx)
    }
}

/// Named limiters selected by the matched route rule.
pub struct RouteRateLimitStage {
    limiters: HashMap<String, Arc<RateLimiter>>,
}

impl RouteRateLimitStage {
    pub fn new(limiters: HashMap<String, Arc<RateLimiter>>) -> Self {
        Self { limiters }
    }
}

impl Stage for RouteRateLimitStage {
    fn kind(&self) -> StageKind {
        StageKind::RouteRateLimit
    }

    fn evaluate(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Flow {
        let Some(limiter) = ctx
            .classification
            .rate_limit_bucket()
            .and_then(|bucket| self.limiters.get(bucket))
            .cloned()
        else {
            return Flow::Continue;
        };
        let status = limiter.check(request, ctx.identity.as_ref(), ctx.now_ms);
        limit_flow(status, ctx)
    }
}

/// Resolves the credential into an identity. Never terminates.
pub struct AuthenticateStage {
    resolver: Arc<IdentityResolver>,
}

impl AuthenticateStage {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        Self { resolver }
    }
}

impl Stage for AuthenticateStage {
    fn kind(&self) -> StageKind {
        StageKind::Authenticate
    }

    fn evaluate(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Flow {
        ctx.identity = self.resolver.resolve(request.credential.as_deref());
        Flow::Continue
    }
}

/// Runs the decision engine over the zone, identity, and rule permissions.
pub struct AuthorizeStage {
    table: Arc<PermissionTable>,
    redirects: RedirectConfig,
}

impl AuthorizeStage {
    pub fn new(table: Arc<PermissionTable>, redirects: RedirectConfig) -> Self {
        Self { table, redirects }
    }
}

impl Stage for AuthorizeStage {
    fn kind(&self) -> StageKind {
        StageKind::Authorize
    }

    fn evaluate(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Flow {
        let callback_url = match ctx.zone() {
            Zone::AuthPage => request.query_param("callbackUrl"),
            _ => None,
        };
        let input = DecisionInput {
            zone: ctx.zone(),
            identity: ctx.identity.as_ref(),
            required_permissions: ctx.classification.required_permissions(),
            path: &request.path,
            callback_url: callback_url.as_deref(),
            rate_limit: None,
        };
        match decide(&input, &self.table, &self.redirects) {
            Action::Pass => Flow::Continue,
            action => Flow::Terminate(action),
        }
    }
}

/// Final result of one pipeline run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub action: Action,
    pub zone: Zone,
    pub identity: Option<Identity>,
    pub rate_limit: Option<RateLimitStatus>,
}

pub struct Pipeline {
    classifier: Arc<RouteClassifier>,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(classifier: Arc<RouteClassifier>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self { classifier, stages }
    }

    pub fn stage_order(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    pub fn run(&self, request: &GatewayRequest, now_ms: u64) -> Outcome {
        let classification = self.classifier.classify(&request.path);
        let mut ctx = GatewayContext::new(classification, now_ms);

        let action = match check_canonical(&request.path) {
            Ok(()) => self.run_stages(request, &mut ctx),
            Err(defect) => {
                tracing::debug!(path = %request.path, ?defect, "Non-canonical path refused");
                Action::from_error(&GatewayError::MalformedPath)
            }
        };

        Outcome {
            action,
            zone: ctx.zone(),
            identity: ctx.identity,
            rate_limit: ctx.rate_limit,
        }
    }

    fn run_stages(&self, request: &GatewayRequest, ctx: &mut GatewayContext) -> Action {
        let preflight = is_preflight(request, ctx.zone());
        for stage in &self.stages {
            if preflight && !stage.kind().limits_anonymous() {
                continue;
            }
            if let Flow::Terminate(action) = stage.evaluate(request, ctx) {
                tracing::debug!(stage = %stage.kind(), action = action.label(), "Pipeline terminated");
                return action;
            }
        }
        if preflight {
            Action::Preflight
        } else {
            Action::Pass
        }
    }
}

fn is_preflight(request: &GatewayRequest, zone: Zone) -> bool {
    request.method == Method::OPTIONS && zone.is_api() && request.origin.is_some()
}
