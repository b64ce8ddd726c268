//! Read/write counters
//!
//! The adapter reports through an injected [`ObservabilitySink`] instead of
//! mutating process-wide state. [`StatCounters`] keeps atomic counters plus a
//! per-bucket key log; [`NoopSink`] discards everything.
//!
//! Counters are advisory: Relaxed ordering, no cross-counter consistency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// Receiver of read, write and search observations
pub trait ObservabilitySink: Send + Sync {
    /// A record was fetched from `bucket`
    fn record_read(&self, bucket: &str, key: &str);

    /// A record was saved; `created` is false for overwrites
    fn record_save(&self, bucket: &str, key: &str, created: bool);

    /// A search ran against `bucket`'s index
    fn record_search(&self, bucket: &str, query: &str);

    /// A zero-row count search ran
    fn record_count(&self, bucket: &str, query: &str);
}

/// Sink that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {
    fn record_read(&self, _: &str, _: &str) {}
    fn record_save(&self, _: &str, _: &str, _: bool) {}
    fn record_search(&self, _: &str, _: &str) {}
    fn record_count(&self, _: &str, _: &str) {}
}

/// Atomic counters with a per-bucket log of touched keys
#[derive(Debug, Default)]
pub struct StatCounters {
    saves: AtomicU64,
    updates: AtomicU64,
    reads: AtomicU64,
    searches: AtomicU64,
    counts: AtomicU64,
    keys: Mutex<BTreeMap<String, Vec<String>>>,
}

impl StatCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_key(&self, bucket: &str, key: &str) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.entry(bucket.to_string())
                .or_default()
                .push(key.to_string());
        }
    }

    /// Keys read or saved in `bucket`, in order
    pub fn keys_for(&self, bucket: &str) -> Vec<String> {
        self.keys
            .lock()
            .ok()
            .and_then(|keys| keys.get(bucket).cloned())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            saves: self.saves.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            counts: self.counts.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl ObservabilitySink for StatCounters {
    fn record_read(&self, bucket: &str, key: &str) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.log_key(bucket, key);
    }

    fn record_save(&self, bucket: &str, key: &str, created: bool) {
        if created {
            self.saves.fetch_add(1, Ordering::Relaxed);
        } else {
            self.updates.fetch_add(1, Ordering::Relaxed);
        }
        self.log_key(bucket, key);
    }

    fn record_search(&self, _bucket: &str, _query: &str) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_count(&self, _bucket: &str, _query: &str) {
        self.counts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub saves: u64,
    pub updates: u64,
    pub reads: u64,
    pub searches: u64,
    pub counts: u64,
}
