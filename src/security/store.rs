//! Rate-limit counter storage.
//!
//! # Responsibilities
//! - Fetch-or-create a counter per key
//! - Apply the fixed-window reset rule atomically with the increment
//! - Reset single keys or everything on demand
//! - Evict counters whose window has passed
//!
//! # Design Decisions
//! - Limiters talk to the `CounterStore` trait, never to a global map
//! - The in-memory store is process-local; several gateway instances behind a
//!   load balancer each count independently unless a shared store is plugged in

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

/// Composite counter key: (route bucket, caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RateLimitKey {
    pub bucket: String,
    pub caller: String,
}

impl RateLimitKey {
    pub fn new(bucket: impl Into<String>, caller: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            caller: caller.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bucket, self.caller)
    }
}

/// Fixed-window counter for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitCounter {
    pub count: u32,
    pub window_start_ms: u64,
    pub max: u32,
    pub window_ms: u64,
}

impl RateLimitCounter {
    pub fn reset_at_ms(&self) -> u64 {
        self.window_start_ms.saturating_add(self.window_ms)
    }

    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.count)
    }

    pub fn is_exceeded(&self) -> bool {
        self.count > self.max
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.window_start_ms) >= self.window_ms
    }
}

/// Storage for rate-limit counters.
///
/// `increment` must be atomic per key: the expiry check, reset, and
/// increment happen under one lock.
pub trait CounterStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &RateLimitKey) -> Option<RateLimitCounter>;

    /// Count one request and return the updated counter. A missing or
    /// expired counter restarts at 1 with `window_start_ms = now_ms`.
    fn increment(&self, key: &RateLimitKey, now_ms: u64, window_ms: u64, max: u32)
        -> RateLimitCounter;

    /// Drop one key. Returns whether it existed.
    fn reset(&self, key: &RateLimitKey) -> bool;

    /// Drop every key. Returns how many were removed.
    fn reset_all(&self) -> usize;

    /// Evict expired counters. Returns how many were removed.
    fn sweep(&self, now_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<RateLimitKey, RateLimitCounter>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn get(&self, key: &RateLimitKey) -> Option<RateLimitCounter> {
        self.counters.get(key).map(|c| *c)
    }

    fn increment(
        &self,
        key: &RateLimitKey,
        now_ms: u64,
        window_ms: u64,
        max: u32,
    ) -> RateLimitCounter {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut entry = self
            .counters
            .entry(key.clone())
            .or_insert(RateLimitCounter {
                count: 0,
                window_start_ms: now_ms,
                max,
                window_ms,
            });
        let counter = entry.value_mut();
        counter.max = max;
        counter.window_ms = window_ms;

        if counter.count == 0 || counter.is_expired(now_ms) {
            counter.count = 1;
            counter.window_start_ms = now_ms;
        } else {
            counter.count = counter.count.saturating_add(1);
        }
        *counter
    }

    fn reset(&self, key: &RateLimitKey) -> bool {
        self.counters.remove(key).is_some()
    }

    fn reset_all(&self) -> usize {
        let removed = self.counters.len();
        self.counters.clear();
        removed
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now_ms));
        before.saturating_sub(self.counters.len())
    }

    fn len(&self) -> usize {
        self.counters.len()
    }
}
