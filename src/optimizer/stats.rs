//! Access frequency and co-access statistics behind caching recommendations

use std::collections::HashMap;
use std::time::{Duration, Instant};

use xxhash_rust::xxh3::Xxh3Builder;

use crate::cache::budget::MemoryStats;
use crate::cache::policy::CachingStrategy;

/// Accesses closer together than this count as co-accessed
pub const CO_ACCESS_WINDOW: Duration = Duration::from_millis(250);

/// Co-access count from which a pair is worth preloading together
pub const PRELOAD_PAIR_THRESHOLD: u64 = 3;

/// Access count from which an asset is considered hot
pub const HOT_ASSET_THRESHOLD: u64 = 10;

/// Lookups needed before the hit rate is trusted
pub const MIN_LOOKUPS_FOR_HIT_RATE: u64 = 20;

/// What a recommendation suggests doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    /// Preload the assets together
    Preload,
    /// Keep the assets resident by acquiring them
    Pin,
    /// Switch the active caching strategy
    SwitchStrategy(CachingStrategy),
}

/// Advisory output of [`AccessStats::recommendations`]
#[derive(Debug, Clone, PartialEq)]
pub struct CachingRecommendation {
    pub kind: RecommendationKind,
    pub asset_ids: Vec<String>,
    pub rationale: String,
    pub expected_benefit: String,
}

/// Most distinct assets remembered inside the co-access window
pub const MAX_WINDOW_ASSETS: usize = 64;

/// Distinct assets tracked before counters are decayed
pub const MAX_TRACKED_ASSETS: usize = 4096;

/// Distinct pairs tracked before counters are decayed
pub const MAX_TRACKED_PAIRS: usize = 16_384;

type PairCounts = HashMap<String, HashMap<String, u64, Xxh3Builder>, Xxh3Builder>;

/// Counters fed from `AssetAccessed` events
#[derive(Debug, Default)]
pub struct AccessStats {
    counts: HashMap<String, u64, Xxh3Builder>,
    /// Lexicographically smaller id -> larger id -> co-access count
    pairs: PairCounts,
    pair_total: usize,
    /// Latest access per asset inside the window
    window: HashMap<String, Instant, Xxh3Builder>,
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl AccessStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &str, at: Instant) {
        match self.counts.get_mut(id) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(id.to_string(), 1);
            }
        }

        self.window
            .retain(|_, seen| at.saturating_duration_since(*seen) <= CO_ACCESS_WINDOW);

        for other in self.window.keys() {
            if other != id {
                let (first, second) = ordered(id, other);
                Self::bump_pair(&mut self.pairs, &mut self.pair_total, first, second);
            }
        }

        match self.window.get_mut(id) {
            Some(seen) => *seen = at,
            None => {
                self.window.insert(id.to_string(), at);
            }
        }
        if self.window.len() > MAX_WINDOW_ASSETS {
            let oldest = self
                .window
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(other, _)| other.clone());
            if let Some(oldest) = oldest {
                self.window.remove(&oldest);
            }
        }

        if self.counts.len() > MAX_TRACKED_ASSETS || self.pair_total > MAX_TRACKED_PAIRS {
            self.decay();
        }
    }

    fn bump_pair(pairs: &mut PairCounts, total: &mut usize, first: &str, second: &str) {
        if let Some(count) = pairs.get_mut(first).and_then(|inner| inner.get_mut(second)) {
            *count += 1;
            return;
        }
        pairs
            .entry(first.to_string())
            .or_default()
            .insert(second.to_string(), 1);
        *total += 1;
    }

    /// Halve every counter until the tracked sets fit again
    fn decay(&mut self) {
        while self.counts.len() > MAX_TRACKED_ASSETS || self.pair_total > MAX_TRACKED_PAIRS {
            self.counts.retain(|_, count| {
                *count /= 2;
                *count > 0
            });
            let mut total = 0;
            self.pairs.retain(|_, inner| {
                inner.retain(|_, count| {
                    *count /= 2;
                    *count > 0
                });
                total += inner.len();
                !inner.is_empty()
            });
            self.pair_total = total;
        }
        log::debug!(
            "Decayed access statistics to {} assets and {} pairs",
            self.counts.len(),
            self.pair_total
        );
    }

    pub fn access_count(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    pub fn co_access_count(&self, a: &str, b: &str) -> u64 {
        let (first, second) = ordered(a, b);
        self.pairs
            .get(first)
            .and_then(|inner| inner.get(second))
            .copied()
            .unwrap_or(0)
    }

    pub fn tracked_assets(&self) -> usize {
        self.counts.len()
    }

    pub fn tracked_pairs(&self) -> usize {
        self.pair_total
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.pairs.clear();
        self.pair_total = 0;
        self.window.clear();
    }

    /// Derive recommendations; never mutates anything
    pub fn recommendations(
        &self,
        memory: &MemoryStats,
        hit_rate: f32,
        lookups: u64,
        strategy: CachingStrategy,
    ) -> Vec<CachingRecommendation> {
        let mut out = Vec::new();

        let mut pairs: Vec<(&String, &String, u64)> = self
            .pairs
            .iter()
            .flat_map(|(first, inner)| {
                inner
                    .iter()
                    .map(move |(second, count)| (first, second, *count))
            })
            .filter(|(_, _, count)| *count >= PRELOAD_PAIR_THRESHOLD)
            .collect();
        pairs.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| a.0.cmp(b.0))
                .then_with(|| a.1.cmp(b.1))
        });
        for (first, second, count) in pairs {
            out.push(CachingRecommendation {
                kind: RecommendationKind::Preload,
                asset_ids: vec![first.clone(), second.clone()],
                rationale: format!("{first} and {second} were accessed together {count} times"),
                expected_benefit: "fewer cache misses when either is requested".to_string(),
            });
        }

        let mut hot: Vec<(&String, &u64)> = self
            .counts
            .iter()
            .filter(|(_, count)| **count >= HOT_ASSET_THRESHOLD)
            .collect();
        hot.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        if !hot.is_empty() {
            out.push(CachingRecommendation {
                kind: RecommendationKind::Pin,
                asset_ids: hot.iter().map(|(id, _)| (*id).clone()).collect(),
                rationale: format!(
                    "{} assets were accessed at least {HOT_ASSET_THRESHOLD} times",
                    hot.len()
                ),
                expected_benefit: "hot assets survive eviction under pressure".to_string(),
            });
        }

        if memory.utilization > 80.0 && strategy != CachingStrategy::MemoryOptimized {
            out.push(CachingRecommendation {
                kind: RecommendationKind::SwitchStrategy(CachingStrategy::MemoryOptimized),
                asset_ids: Vec::new(),
                rationale: format!("memory utilization is {:.1}%", memory.utilization),
                expected_benefit: "earlier cleanup and more headroom for admissions".to_string(),
            });
        } else if lookups >= MIN_LOOKUPS_FOR_HIT_RATE
            && hit_rate < 50.0
            && strategy != CachingStrategy::Aggressive
        {
            out.push(CachingRecommendation {
                kind: RecommendationKind::SwitchStrategy(CachingStrategy::Aggressive),
                asset_ids: Vec::new(),
                rationale: format!("cache hit rate is {hit_rate:.1}%"),
                expected_benefit: "deeper prefetch raises the hit rate".to_string(),
            });
        }

        out
    }
}
