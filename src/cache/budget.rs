//! Memory budget accounting and the eviction planner

use std::time::Instant;

use crate::types::Priority;

/// Ceiling of the reference embedded GPU profile
pub const REFERENCE_MEMORY_MB: f64 = 2048.0;

/// Fixed ceiling plus the live sum of resident footprints
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryBudget {
    max_mb: f64,
    used_mb: f64,
}

impl MemoryBudget {
    pub fn new(max_mb: f64) -> Self {
        Self {
            max_mb: max_mb.max(0.0),
            used_mb: 0.0,
        }
    }

    pub fn max_mb(&self) -> f64 {
        self.max_mb
    }

    pub fn used_mb(&self) -> f64 {
        self.used_mb
    }

    pub fn available_mb(&self) -> f64 {
        (self.max_mb - self.used_mb).max(0.0)
    }

    /// Utilization as a percentage of the ceiling
    pub fn utilization(&self) -> f64 {
        if self.max_mb > 0.0 {
            self.used_mb / self.max_mb * 100.0
        } else {
            100.0
        }
    }

    pub fn fits(&self, footprint_mb: f64) -> bool {
        self.used_mb + footprint_mb <= self.max_mb
    }

    pub(crate) fn charge(&mut self, footprint_mb: f64) {
        self.used_mb += footprint_mb;
    }

    pub(crate) fn reclaim(&mut self, footprint_mb: f64) {
        self.used_mb = (self.used_mb - footprint_mb).max(0.0);
    }

    pub(crate) fn reset(&mut self) {
        self.used_mb = 0.0;
    }
}

/// Read-only snapshot published as a `MemoryStats` event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryStats {
    pub used_mb: f64,
    pub max_mb: f64,
    /// Percentage of `max_mb` in use
    pub utilization: f64,
    pub resident_count: usize,
    pub loading_count: usize,
    pub preload_queue_depth: usize,
}

/// A resident asset that may be evicted
#[derive(Debug, Clone)]
pub(crate) struct EvictionCandidate {
    pub id: String,
    pub priority: Priority,
    pub last_access: Instant,
    pub footprint_mb: f64,
}

/// Sort candidates into eviction order: lowest priority, then least
/// recently used.
pub(crate) fn eviction_order(candidates: &mut [EvictionCandidate]) {
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.last_access.cmp(&b.last_access))
    });
}

/// Pick victims, in eviction order, until `need_mb` is covered.
///
/// Returns `None` when the candidates cannot cover it; nothing is chosen in
/// that case. After the need is met, keeps taking candidates while the
/// running total is below `want_mb`.
pub(crate) fn plan_evictions(
    mut candidates: Vec<EvictionCandidate>,
    need_mb: f64,
    want_mb: f64,
) -> Option<Vec<EvictionCandidate>> {
    if need_mb <= 0.0 {
        return Some(Vec::new());
    }
    eviction_order(&mut candidates);

    let mut freed = 0.0;
    let mut plan = Vec::new();
    for candidate in candidates {
        if freed >= need_mb && freed >= want_mb {
            break;
        }
        freed += candidate.footprint_mb;
        plan.push(candidate);
    }

    (freed >= need_mb).then_some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn candidate(id: &str, priority: Priority, age_ms: u64, mb: f64) -> EvictionCandidate {
        EvictionCandidate {
            id: id.to_string(),
            priority,
            last_access: Instant::now() - Duration::from_millis(age_ms),
            footprint_mb: mb,
        }
    }

    #[test]
    fn test_budget_accounting() {
        let mut budget = MemoryBudget::new(200.0);
        budget.charge(150.0);
        assert!(budget.fits(50.0));
        assert!(!budget.fits(50.5));
        assert_eq!(budget.utilization(), 75.0);
        budget.reclaim(500.0);
        assert_eq!(budget.used_mb(), 0.0);
    }

    #[test]
    fn test_order_priority_then_lru() {
        let mut c = vec![
            candidate("new_low", Priority::Low, 10, 1.0),
            candidate("old_high", Priority::High, 1000, 1.0),
            candidate("old_low", Priority::Low, 1000, 1.0),
        ];
        eviction_order(&mut c);
        let ids: Vec<_> = c.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["old_low", "new_low", "old_high"]);
    }

    #[test]
    fn test_plan_insufficient_is_none() {
        let c = vec![candidate("a", Priority::Low, 0, 5.0)];
        assert!(plan_evictions(c, 10.0, 10.0).is_none());
    }

    #[test]
    fn test_plan_takes_headroom() {
        let c = vec![
            candidate("a", Priority::Low, 30, 5.0),
            candidate("b", Priority::Low, 20, 5.0),
            candidate("c", Priority::Low, 10, 5.0),
        ];
        let minimal = plan_evictions(c.clone(), 4.0, 4.0).unwrap();
        assert_eq!(minimal.len(), 1);
        let generous = plan_evictions(c, 4.0, 9.0).unwrap();
        assert_eq!(generous.len(), 2);
    }
}
