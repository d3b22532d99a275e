//! Windowed rate limiting.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::{KeyStrategy, RateLimitConfig};
use crate::gateway::GatewayRequest;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::security::store::{CounterStore, RateLimitKey};

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Caller-key function for custom limiters.
pub type KeyFn = dyn Fn(&GatewayRequest, Option<&Identity>) -> Option<String> + Send + Sync;

/// Derives the caller half of a [`RateLimitKey`]. Returning `None` skips the
/// limiter for that request.
#[derive(Clone)]
pub enum KeyGenerator {
    Ip,
    Identity,
    IpAndIdentity,
    Custom(Arc<KeyFn>),
}

impl KeyGenerator {
    pub fn generate(&self, request: &GatewayRequest, identity: Option<&Identity>) -> Option<String> {
        match self {
            KeyGenerator::Ip => Some(request.client_ip.clone()),
            KeyGenerator::Identity => identity.map(|id| format!("user:{}", id.subject_id)),
            KeyGenerator::IpAndIdentity => Some(match identity {
                Some(id) => format!("{}:{}", request.client_ip, id.subject_id),
                None => format!("{}:anonymous", request.client_ip),
            }),
            KeyGenerator::Custom(f) => f(request, identity),
        }
    }
}

impl From<KeyStrategy> for KeyGenerator {
    fn from(strategy: KeyStrategy) -> Self {
        match strategy {
            KeyStrategy::Ip => KeyGenerator::Ip,
            KeyStrategy::Identity => KeyGenerator::Identity,
            KeyStrategy::IpAndIdentity => KeyGenerator::IpAndIdentity,
        }
    }
}

impl std::fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyGenerator::Ip => f.write_str("Ip"),
            KeyGenerator::Identity => f.write_str("Identity"),
            KeyGenerator::IpAndIdentity => f.write_str("IpAndIdentity"),
            KeyGenerator::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
    /// Whether `X-RateLimit-*` headers should describe this status.
    #[serde(skip)]
    pub standard_headers: bool,
}

impl RateLimitStatus {
    /// Seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

/// Details handed to `on_limit_reached`.
#[derive(Debug)]
pub struct LimitReached<'a> {
    pub key: &'a RateLimitKey,
    pub path: &'a str,
    pub now_ms: u64,
    pub status: RateLimitStatus,
}

pub type LimitCallback = Arc<dyn Fn(&LimitReached<'_>) + Send + Sync>;

/// Fixed-window limiter over a [`CounterStore`].
pub struct RateLimiter {
    bucket: String,
    window_ms: u64,
    max: u32,
    standard_headers: bool,
    key_generator: KeyGenerator,
    on_limit_reached: Option<LimitCallback>,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(bucket: impl Into<String>, config: &RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        Self {
            bucket: bucket.into(),
            window_ms: config.window_ms,
            max: config.max,
            standard_headers: config.standard_headers,
            key_generator: config.key.into(),
            on_limit_reached: None,
            store,
        }
    }

    pub fn with_key_generator(mut self, key_generator: KeyGenerator) -> Self {
        self.key_generator = key_generator;
        self
    }

    pub fn on_limit_reached(mut self, callback: LimitCallback) -> Self {
        self.on_limit_reached = Some(callback);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Count the request against this limiter. `None` when the key generator
    /// produced no key (e.g. a per-user limiter and an anonymous caller).
    pub fn check(
        &self,
        request: &GatewayRequest,
        identity: Option<&Identity>,
        now_ms: u64,
    ) -> Option<RateLimitStatus> {
        let caller = self.key_generator.generate(request, identity)?;
        Some(self.hit(&caller, &request.path, now_ms))
    }

    /// Count one request for an explicit caller key.
    pub fn hit(&self, caller: &str, path: &str, now_ms: u64) -> RateLimitStatus {
        let key = RateLimitKey::new(self.bucket.as_str(), caller);
        let counter = self.store.increment(&key, now_ms, self.window_ms, self.max);

        let status = RateLimitStatus {
            allowed: !counter.is_exceeded(),
            limit: self.max,
            remaining: counter.remaining(),
            reset_at_ms: counter.reset_at_ms(),
            standard_headers: self.standard_headers,
        };

        if !status.allowed {
            tracing::warn!(key = %key, path = %path, count = counter.count, "Rate limit exceeded");
            metrics::record_rate_limited(&self.bucket);
            if let Some(callback) = &self.on_limit_reached {
                callback(&LimitReached {
                    key: &key,
                    path,
                    now_ms,
                    status,
                });
            }
        }

        status
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("bucket", &self.bucket)
            .field("window_ms", &self.window_ms)
            .field("max", &self.max)
            .field("key_generator", &self.key_generator)
            .finish_non_exhaustive()
    }
}
