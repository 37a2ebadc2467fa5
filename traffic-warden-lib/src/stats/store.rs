use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use super::client::ClientStats;

/// Aggregated traffic for one calendar bucket (a day or a month).
#[derive(Debug, Default, Clone)]
pub struct TimeWindowStats {
    /// Bytes received across all clients
    pub total_ingress_bytes: u64,
    /// Bytes sent across all clients
    pub total_egress_bytes: u64,
    /// Per-client counters keyed by client identifier
    pub clients: AHashMap<String, ClientStats>,
}

impl TimeWindowStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, client_id: &str) -> Option<&ClientStats> {
        self.clients.get(client_id)
    }

    /// Get the client's entry, creating a zeroed one stamped with `now_ms`.
    pub fn client_mut(&mut self, client_id: &str, now_ms: u64) -> &mut ClientStats {
        self.clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientStats::new(now_ms))
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            total_ingress_bytes: self.total_ingress_bytes,
            total_egress_bytes: self.total_egress_bytes,
            clients: self
                .clients
                .iter()
                .map(|(id, stats)| (id.clone(), stats.clone()))
                .collect(),
        }
    }
}

pub type SharedWindow = Arc<Mutex<TimeWindowStats>>;

/// Buckets of one granularity, keyed by calendar string.
///
/// The map itself sits behind a `RwLock` that is only taken for writing when
/// a bucket is created or removed; every bucket carries its own `Mutex` so
/// commits to different days never contend.
#[derive(Debug, Default)]
pub struct BucketMap {
    buckets: RwLock<AHashMap<String, SharedWindow>>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashMap<String, SharedWindow>> {
        self.buckets.read().unwrap_or_else(|poisoned| {
            warn!("bucket map lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<String, SharedWindow>> {
        self.buckets.write().unwrap_or_else(|poisoned| {
            warn!("bucket map lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, key: &str) -> Option<SharedWindow> {
        self.read().get(key).cloned()
    }

    /// Get the bucket for `key`, creating an empty one on first traffic.
    pub fn get_or_create(&self, key: &str) -> SharedWindow {
        if let Some(window) = self.get(key) {
            return window;
        }
        self.write()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TimeWindowStats::new())))
            .clone()
    }

    /// Run `f` on the bucket for `key` under its lock, creating it if needed.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut TimeWindowStats) -> R) -> R {
        let window = self.get_or_create(key);
        let mut guard = lock_window(&window);
        f(&mut guard)
    }

    /// Run `f` on an existing bucket under its lock. Never creates a bucket.
    pub fn inspect<R>(&self, key: &str, f: impl FnOnce(&TimeWindowStats) -> R) -> Option<R> {
        let window = self.get(key)?;
        let guard = lock_window(&window);
        Some(f(&guard))
    }

    /// Mutate an existing bucket under its lock. Never creates a bucket.
    pub fn modify<R>(&self, key: &str, f: impl FnOnce(&mut TimeWindowStats) -> R) -> Option<R> {
        let window = self.get(key)?;
        let mut guard = lock_window(&window);
        Some(f(&mut guard))
    }

    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Greatest key, which for ISO dates is the most recent bucket.
    pub fn latest_key(&self) -> Option<String> {
        self.read().keys().max().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn snapshot(&self) -> BTreeMap<String, WindowSnapshot> {
        let buckets: Vec<(String, SharedWindow)> = self
            .read()
            .iter()
            .map(|(key, window)| (key.clone(), window.clone()))
            .collect();
        buckets
            .into_iter()
            .map(|(key, window)| {
                let snapshot = lock_window(&window).snapshot();
                (key, snapshot)
            })
            .collect()
    }
}

fn lock_window(window: &Mutex<TimeWindowStats>) -> MutexGuard<'_, TimeWindowStats> {
    window.lock().unwrap_or_else(|poisoned| {
        warn!("traffic window lock poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Process-wide traffic statistics, shared between requests as
/// `Arc<TrafficStats>`.
#[derive(Debug, Default)]
pub struct TrafficStats {
    daily: BucketMap,
    monthly: BucketMap,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn daily(&self) -> &BucketMap {
        &self.daily
    }

    pub fn monthly(&self) -> &BucketMap {
        &self.monthly
    }

    /// Owned copy of every bucket, sorted by key.
    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot { daily: self.daily.snapshot(), monthly: self.monthly.snapshot() }
    }
}

/// Point-in-time copy of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub total_ingress_bytes: u64,
    pub total_egress_bytes: u64,
    pub clients: BTreeMap<String, ClientStats>,
}

/// Point-in-time copy of all statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSnapshot {
    pub daily: BTreeMap<String, WindowSnapshot>,
    pub monthly: BTreeMap<String, WindowSnapshot>,
}
