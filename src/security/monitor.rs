//! Rate-limit violation log.
//!
//! Bounded in-memory record of denials, read by the admin reporting surface.
//! Oldest records are dropped once capacity is reached.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::security::rate_limit::LimitReached;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub timestamp: DateTime<Utc>,
    pub key: String,
    pub bucket: String,
    pub path: String,
    pub exceeded: bool,
}

impl ViolationRecord {
    pub fn from_event(event: &LimitReached<'_>) -> Self {
        let millis = i64::try_from(event.now_ms).unwrap_or(i64::MAX);
        Self {
            timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now),
            key: event.key.caller.clone(),
            bucket: event.key.bucket.clone(),
            path: event.path.to_string(),
            exceeded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: usize,
}

/// Aggregate over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStats {
    pub window_secs: i64,
    pub total: usize,
    pub unique_keys: usize,
    pub top_paths: Vec<PathCount>,
}

const TOP_PATHS: usize = 10;

#[derive(Debug)]
pub struct ViolationLog {
    records: Mutex<VecDeque<ViolationRecord>>,
    capacity: usize,
}

impl ViolationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ViolationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, record: ViolationRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.lock();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ViolationRecord> {
        self.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self, window: Duration, now: DateTime<Utc>) -> ViolationStats {
        let since = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let records = self.lock();

        let mut keys = HashSet::new();
        let mut paths: HashMap<&str, usize> = HashMap::new();
        let mut total = 0;
        for record in records.iter().filter(|r| r.timestamp >= since) {
            total += 1;
            keys.insert(record.key.as_str());
            *paths.entry(record.path.as_str()).or_default() += 1;
        }

        let mut top_paths: Vec<PathCount> = paths
            .into_iter()
            .map(|(path, count)| PathCount {
                path: path.to_string(),
                count,
            })
            .collect();
        top_paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        top_paths.truncate(TOP_PATHS);

        ViolationStats {
            window_secs: window.num_seconds(),
            total,
            unique_keys: keys.len(),
            top_paths,
        }
    }

    /// Remove every record. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut records = self.lock();
        let n = records.len();
        records.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
