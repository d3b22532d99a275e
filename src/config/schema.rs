//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gateway::StageKind;
use crate::rbac::PermissionTable;
use crate::routing::Zone;

/// Root configuration for the authorization gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, proxy trust).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Credential verification settings.
    pub identity: IdentityConfig,

    /// Global per-caller rate limit.
    pub rate_limit: RateLimitConfig,

    /// Per-authenticated-user limit layered on top of the global one.
    pub user_rate_limit: RateLimitConfig,

    /// Named per-route limits referenced by `routes[].rate_limit`.
    pub rate_limits: BTreeMap<String, RateLimitConfig>,

    /// Counter store housekeeping.
    pub counter_store: CounterStoreConfig,

    /// Classification settings.
    pub routing: RoutingConfig,

    /// Ordered route rules.
    pub routes: Vec<RouteConfig>,

    /// Role name → permission list. Must cover every role.
    pub permissions: BTreeMap<String, Vec<String>>,

    /// CORS policy stamped on API responses.
    pub cors: CorsConfig,

    /// Redirect targets for page zones.
    pub redirects: RedirectConfig,

    /// Declared stage order.
    pub pipeline: PipelineConfig,

    /// Violation log settings.
    pub monitoring: MonitoringConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Optional application server behind the gateway.
    pub upstream: UpstreamConfig,

    /// Security hardening.
    pub security: SecurityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            identity: IdentityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            user_rate_limit: RateLimitConfig::per_user_default(),
            rate_limits: Self::default_rate_limits(),
            counter_store: CounterStoreConfig::default(),
            routing: RoutingConfig::default(),
            routes: Self::default_routes(),
            permissions: Self::default_permissions(),
            cors: CorsConfig::default(),
            redirects: RedirectConfig::default(),
            pipeline: PipelineConfig::default(),
            monitoring: MonitoringConfig::default(),
            observability: ObservabilityConfig::default(),
            upstream: UpstreamConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Take the client IP from `X-Forwarded-For` (only behind a trusted proxy).
    pub trust_forwarded_for: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded_for: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Credential settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// HS256 shared secret. Overridden by `GATEWAY_JWT_SECRET`.
    pub secret: String,

    /// Session cookie consulted when no bearer token is present.
    pub cookie_name: String,

    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,

    /// Lifetime of credentials minted by the issuer, in seconds.
    pub credential_ttl_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "session-token".to_string(),
            leeway_secs: 0,
            credential_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// How a limiter derives the caller half of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    Ip,
    Identity,
    IpAndIdentity,
}

/// Windowed rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable this limiter.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per key per window.
    pub max: u32,

    /// Emit `X-RateLimit-*` headers.
    pub standard_headers: bool,

    /// Caller key derivation.
    pub key: KeyStrategy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            max: 100,
            standard_headers: true,
            key: KeyStrategy::Ip,
        }
    }
}

impl RateLimitConfig {
    pub fn per_user_default() -> Self {
        Self {
            enabled: false,
            window_ms: 60_000,
            max: 300,
            standard_headers: true,
            key: KeyStrategy::Identity,
        }
    }
}

/// Counter store housekeeping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CounterStoreConfig {
    /// Interval between evictions of expired counters, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

/// Classification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Paths under this prefix get API zone variants.
    pub api_prefix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
        }
    }
}

/// Route rule mapping a path prefix to a zone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix (`/` matches the root only).
    pub pattern: String,

    /// Security zone for matching paths.
    pub zone: Zone,

    /// Permissions, any one of which grants access.
    #[serde(default)]
    pub required_permissions: Vec<String>,

    /// Name of a `[rate_limits.<name>]` bucket.
    #[serde(default)]
    pub rate_limit: Option<String>,
}

impl RouteConfig {
    pub fn new(pattern: &str, zone: Zone) -> Self {
        Self {
            pattern: pattern.to_string(),
            zone,
            required_permissions: Vec::new(),
            rate_limit: None,
        }
    }
}

/// CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origin: String,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:3000".to_string(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

/// Redirect targets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    pub signin: String,
    pub dashboard: String,
    pub verify_email: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            signin: "/auth/signin".to_string(),
            dashboard: "/dashboard".to_string(),
            verify_email: "/auth/verify-email".to_string(),
        }
    }
}

/// Stage order after classification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub order: Vec<StageKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: StageKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

/// Violation log settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Maximum retained violation records.
    pub max_violations: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            max_violations: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "authz_gateway=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Upstream application settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL passed requests are forwarded to (e.g. "http://127.0.0.1:3000").
    pub url: Option<String>,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

impl GatewayConfig {
    /// Route table for the dashboard application.
    pub fn default_routes() -> Vec<RouteConfig> {
        let mut api_auth = RouteConfig::new("/api/auth", Zone::ApiPublic);
        api_auth.rate_limit = Some("auth".to_string());

        vec![
            RouteConfig::new("/", Zone::Public),
            RouteConfig::new("/auth", Zone::AuthPage),
            RouteConfig::new("/auth/verify-email", Zone::Public),
            RouteConfig::new("/auth/error", Zone::Public),
            RouteConfig::new("/dashboard", Zone::Protected),
            RouteConfig::new("/settings", Zone::Protected),
            RouteConfig::new("/billing", Zone::Protected),
            RouteConfig::new("/admin", Zone::Admin),
            RouteConfig::new("/moderation", Zone::Moderator),
            RouteConfig::new("/api", Zone::ApiProtected),
            api_auth,
            RouteConfig::new("/api/health", Zone::ApiPublic),
            RouteConfig::new("/api/public", Zone::ApiPublic),
            RouteConfig::new("/api/admin", Zone::ApiAdmin),
            RouteConfig::new("/api/moderation", Zone::ApiModerator),
        ]
    }

    pub fn default_rate_limits() -> BTreeMap<String, RateLimitConfig> {
        BTreeMap::from([(
            "auth".to_string(),
            RateLimitConfig {
                enabled: true,
                window_ms: 15 * 60_000,
                max: 5,
                standard_headers: true,
                key: KeyStrategy::Ip,
            },
        )])
    }

    pub fn default_permissions() -> BTreeMap<String, Vec<String>> {
        PermissionTable::default_entries()
            .into_iter()
            .map(|(role, perms)| (role.as_str().to_string(), perms))
            .collect()
    }
}
