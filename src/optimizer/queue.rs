//! Priority queue of pending optimization tasks

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use uuid::Uuid;

use super::PerformanceTarget;
use crate::types::Priority;

/// Cost model: fixed processing time per queued asset
pub const ESTIMATED_TIME_PER_TASK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationTask {
    pub task_id: Uuid,
    pub asset_id: String,
    pub priority: Priority,
    pub target: PerformanceTarget,
}

#[derive(Debug)]
struct Entry {
    task: OptimizationTask,
    seq: u64,
}

impl Entry {
    fn rank(&self) -> (Priority, Reverse<u64>) {
        (self.task.priority, Reverse(self.seq))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Number of queued tasks per priority class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl PriorityBreakdown {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }

    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Normal => self.normal += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatus {
    pub total_tasks: usize,
    pub priority_breakdown: PriorityBreakdown,
    pub estimated_processing_time: Duration,
    pub is_processing: bool,
    /// Asset currently being optimized by the worker
    pub in_flight: Option<String>,
}

/// Highest priority first, FIFO within a priority, one task per asset
///
/// Raising the priority of a queued asset pushes a fresh entry; the old one
/// is skipped when it surfaces.
#[derive(Debug, Default)]
pub struct OptimizationQueue {
    heap: BinaryHeap<Entry>,
    /// asset id -> (priority, seq) of its live entry
    live: HashMap<String, (Priority, u64)>,
    next_seq: u64,
}

impl OptimizationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `asset_id`, keeping the higher priority if it is already queued.
    ///
    /// Returns the id of the live task for the asset.
    pub fn push(&mut self, asset_id: &str, priority: Priority, target: PerformanceTarget) -> Uuid {
        if let Some(&(queued, seq)) = self.live.get(asset_id) {
            if queued >= priority {
                return self
                    .heap
                    .iter()
                    .find(|e| e.seq == seq)
                    .map(|e| e.task.task_id)
                    .unwrap_or_else(Uuid::nil);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let task = OptimizationTask {
            task_id: Uuid::new_v4(),
            asset_id: asset_id.to_string(),
            priority,
            target,
        };
        let task_id = task.task_id;
        self.live.insert(asset_id.to_string(), (priority, seq));
        self.heap.push(Entry { task, seq });
        task_id
    }

    pub fn pop(&mut self) -> Option<OptimizationTask> {
        while let Some(entry) = self.heap.pop() {
            let is_live = self
                .live
                .get(&entry.task.asset_id)
                .is_some_and(|&(_, seq)| seq == entry.seq);
            if is_live {
                self.live.remove(&entry.task.asset_id);
                return Some(entry.task);
            }
        }
        None
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.live.contains_key(asset_id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    pub fn breakdown(&self) -> PriorityBreakdown {
        let mut breakdown = PriorityBreakdown::default();
        for &(priority, _) in self.live.values() {
            breakdown.bump(priority);
        }
        breakdown
    }

    pub fn estimated_processing_time(&self) -> Duration {
        ESTIMATED_TIME_PER_TASK * self.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut OptimizationQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop()).map(|t| t.asset_id).collect()
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = OptimizationQueue::new();
        let target = PerformanceTarget::default();
        queue.push("low", Priority::Low, target);
        queue.push("n1", Priority::Normal, target);
        queue.push("crit", Priority::Critical, target);
        queue.push("n2", Priority::Normal, target);

        assert_eq!(drain(&mut queue), vec!["crit", "n1", "n2", "low"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeue_keeps_higher_priority() {
        let mut queue = OptimizationQueue::new();
        let target = PerformanceTarget::default();
        let first = queue.push("a", Priority::High, target);
        assert_eq!(queue.push("a", Priority::Low, target), first);
        queue.push("b", Priority::Normal, target);
        queue.push("b", Priority::Critical, target);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.breakdown().critical, 1);
        assert_eq!(queue.breakdown().high, 1);
        assert_eq!(drain(&mut queue), vec!["b", "a"]);
    }

    #[test]
    fn test_estimate_scales_with_depth() {
        let mut queue = OptimizationQueue::new();
        for id in ["a", "b", "c"] {
            queue.push(id, Priority::Normal, PerformanceTarget::default());
        }
        assert_eq!(queue.estimated_processing_time(), Duration::from_millis(750));
    }
}
