//! Caching strategies and the policy handle shared with the optimizer

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::AssetError;

/// Named bundle of cache tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachingStrategy {
    Aggressive,
    #[default]
    Adaptive,
    Conservative,
    MemoryOptimized,
}

impl CachingStrategy {
    pub const ALL: [CachingStrategy; 4] = [
        CachingStrategy::Aggressive,
        CachingStrategy::Adaptive,
        CachingStrategy::Conservative,
        CachingStrategy::MemoryOptimized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Adaptive => "adaptive",
            Self::Conservative => "conservative",
            Self::MemoryOptimized => "memory_optimized",
        }
    }

    /// Tuning parameters for this strategy
    pub fn policy(&self) -> CachePolicy {
        match self {
            // Prefetch deep, free extra room so bursts of loads don't thrash
            Self::Aggressive => CachePolicy {
                strategy: *self,
                eviction_headroom: 0.10,
                prefetch_depth: 2,
                low_water_mark: 0.70,
                pressure_threshold: 0.85,
            },
            Self::Adaptive => CachePolicy {
                strategy: *self,
                eviction_headroom: 0.05,
                prefetch_depth: 1,
                low_water_mark: 0.70,
                pressure_threshold: 0.85,
            },
            Self::Conservative => CachePolicy {
                strategy: *self,
                eviction_headroom: 0.0,
                prefetch_depth: 0,
                low_water_mark: 0.80,
                pressure_threshold: 0.95,
            },
            Self::MemoryOptimized => CachePolicy {
                strategy: *self,
                eviction_headroom: 0.15,
                prefetch_depth: 0,
                low_water_mark: 0.60,
                pressure_threshold: 0.75,
            },
        }
    }
}

impl fmt::Display for CachingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachingStrategy {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AssetError::UnknownStrategy(s.to_string()))
    }
}

/// Parameters read by admission, eviction, cleanup and preload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub strategy: CachingStrategy,
    /// Extra fraction of the ceiling admission frees beyond the minimum
    pub eviction_headroom: f64,
    /// Dependency levels a preload request expands to
    pub prefetch_depth: usize,
    /// Utilization fraction cleanup evicts down to
    pub low_water_mark: f64,
    /// Utilization fraction that triggers automatic cleanup
    pub pressure_threshold: f64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachingStrategy::default().policy()
    }
}

/// Shared, swappable policy; clones observe the same value
#[derive(Debug, Clone, Default)]
pub struct PolicyHandle(Arc<RwLock<CachePolicy>>);

impl PolicyHandle {
    pub fn new(strategy: CachingStrategy) -> Self {
        Self(Arc::new(RwLock::new(strategy.policy())))
    }

    /// Copy of the active policy
    pub fn current(&self) -> CachePolicy {
        *self.0.read()
    }

    pub fn strategy(&self) -> CachingStrategy {
        self.0.read().strategy
    }

    /// Switch strategy; affects subsequent decisions only
    pub fn apply(&self, strategy: CachingStrategy) {
        *self.0.write() = strategy.policy();
    }

    /// Install custom parameters
    pub fn set(&self, policy: CachePolicy) {
        *self.0.write() = policy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!(
            "memory_optimized".parse::<CachingStrategy>(),
            Ok(CachingStrategy::MemoryOptimized)
        );
        assert_eq!(
            " Aggressive ".parse::<CachingStrategy>(),
            Ok(CachingStrategy::Aggressive)
        );
        assert!(matches!(
            "greedy".parse::<CachingStrategy>(),
            Err(AssetError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_handle_is_shared() {
        let handle = PolicyHandle::default();
        let view = handle.clone();
        assert_eq!(view.strategy(), CachingStrategy::Adaptive);

        handle.apply(CachingStrategy::Conservative);
        assert_eq!(view.current().prefetch_depth, 0);
        assert_eq!(view.strategy(), CachingStrategy::Conservative);
    }

    #[test]
    fn test_watermarks_are_ordered() {
        for strategy in CachingStrategy::ALL {
            let p = strategy.policy();
            assert!(p.low_water_mark < p.pressure_threshold, "{strategy}");
        }
    }
}
