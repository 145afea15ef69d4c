//! Bounded preload queue
//!
//! Higher priority first, FIFO within a priority. The store drains it from a
//! background task.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::types::Priority;

/// Default number of ids the queue holds
pub const DEFAULT_PRELOAD_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadEntry {
    pub id: String,
    pub priority: Priority,
}

#[derive(Debug, Default)]
struct Lanes {
    // Indexed by priority, Critical first
    lanes: [VecDeque<String>; 4],
    queued: HashSet<String>,
}

fn lane(priority: Priority) -> usize {
    match priority {
        Priority::Critical => 0,
        Priority::High => 1,
        Priority::Normal => 2,
        Priority::Low => 3,
    }
}

/// Result of pushing a batch of ids
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub queued: Vec<String>,
    /// Ids refused because the queue was full
    pub rejected: Vec<String>,
}

/// Handles background preloading of assets
#[derive(Debug)]
pub struct PreloadQueue {
    inner: Mutex<Lanes>,
    capacity: usize,
    /// Whether a drain task is currently running
    draining: AtomicBool,
}

impl Default for PreloadQueue {
    fn default() -> Self {
        Self::new(DEFAULT_PRELOAD_CAPACITY)
    }
}

impl PreloadQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lanes::default()),
            capacity,
            draining: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue ids not already queued; overflow is rejected
    pub fn push_all<I>(&self, ids: I, priority: Priority) -> PushOutcome
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.inner.lock();
        let mut outcome = PushOutcome::default();
        for id in ids {
            if inner.queued.contains(&id) {
                continue;
            }
            if inner.queued.len() >= self.capacity {
                outcome.rejected.push(id);
                continue;
            }
            inner.queued.insert(id.clone());
            inner.lanes[lane(priority)].push_back(id.clone());
            outcome.queued.push(id);
        }
        outcome
    }

    /// Get the next asset to preload
    pub fn pop(&self) -> Option<PreloadEntry> {
        let mut inner = self.inner.lock();
        for priority in Priority::ALL {
            if let Some(id) = inner.lanes[lane(priority)].pop_front() {
                inner.queued.remove(&id);
                return Some(PreloadEntry { id, priority });
            }
        }
        None
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().queued.contains(id)
    }

    /// Drop a queued id, returning whether it was queued
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.queued.remove(id) {
            return false;
        }
        for lane in inner.lanes.iter_mut() {
            lane.retain(|queued| queued != id);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the preload queue
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.queued.clear();
        for lane in inner.lanes.iter_mut() {
            lane.clear();
        }
    }

    /// Claim the drainer role; `false` if a drain task already runs
    pub(crate) fn begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end_drain(&self) {
        self.draining.store(false, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}
