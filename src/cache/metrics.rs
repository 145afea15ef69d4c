use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::types::AssetKind;

/// Number of operation samples kept for diagnostics
pub const RECENT_SAMPLES: usize = 64;

/// What a timing sample measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Optimize,
}

/// One timed load or optimization
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSample {
    pub operation: Operation,
    pub asset_id: String,
    pub kind: AssetKind,
    pub duration: Duration,
}

/// Tracks performance metrics for asset loading and caching
#[derive(Debug, Default)]
pub struct AssetMetrics {
    load_times: RwLock<HashMap<String, Duration>>,
    load_counts: RwLock<HashMap<String, u64>>,
    recent: RwLock<VecDeque<OperationSample>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    evictions: AtomicU64,
}

impl AssetMetrics {
    /// Create a new instance of AssetMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed backend load
    pub fn record_load(&self, id: &str, kind: AssetKind, duration: Duration) {
        self.load_times.write().insert(id.to_string(), duration);
        *self.load_counts.write().entry(id.to_string()).or_insert(0) += 1;
        self.record_sample(OperationSample {
            operation: Operation::Load,
            asset_id: id.to_string(),
            kind,
            duration,
        });
    }

    /// Record a completed optimization
    pub fn record_optimization(&self, id: &str, kind: AssetKind, duration: Duration) {
        self.record_sample(OperationSample {
            operation: Operation::Optimize,
            asset_id: id.to_string(),
            kind,
            duration,
        });
    }

    fn record_sample(&self, sample: OperationSample) {
        let mut recent = self.recent.write();
        if recent.len() == RECENT_SAMPLES {
            recent.pop_front();
        }
        recent.push_back(sample);
    }

    /// Record a cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get the cache hit rate as a percentage
    pub fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits() as f32;
        let misses = self.cache_misses() as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }

    /// Get the most recent load time for an asset
    pub fn last_load_time(&self, id: &str) -> Option<Duration> {
        self.load_times.read().get(id).cloned()
    }

    /// Get the load count for an asset
    pub fn load_count(&self, id: &str) -> u64 {
        *self.load_counts.read().get(id).unwrap_or(&0)
    }

    /// Recent samples, oldest first
    pub fn recent_samples(&self) -> Vec<OperationSample> {
        self.recent.read().iter().cloned().collect()
    }

    /// Mean duration of recent samples matching `operation` and `kind`
    pub fn average_duration(&self, operation: Operation, kind: Option<AssetKind>) -> Option<Duration> {
        let recent = self.recent.read();
        let matching: Vec<Duration> = recent
            .iter()
            .filter(|s| s.operation == operation && kind.map_or(true, |k| s.kind == k))
            .map(|s| s.duration)
            .collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching.iter().sum::<Duration>() / matching.len() as u32)
    }
}

/// A thread-safe wrapper around AssetMetrics
#[derive(Debug, Clone, Default)]
pub struct AssetMetricsHandle(Arc<AssetMetrics>);

impl AssetMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(AssetMetrics::new()))
    }

    /// Get a reference to the underlying metrics
    pub fn inner(&self) -> &AssetMetrics {
        &self.0
    }
}

impl std::ops::Deref for AssetMetricsHandle {
    type Target = AssetMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
