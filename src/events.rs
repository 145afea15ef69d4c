//! Publish/subscribe channel for cache and optimizer state changes
//!
//! Subscribers are plain function handles registered against one event tag
//! (or all of them). Handlers run synchronously on the publishing thread and
//! are called without any bus lock held, so a handler may publish or
//! subscribe itself.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::cache::budget::MemoryStats;
use crate::types::AssetKind;

/// Closed set of event tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ModelLoaded,
    TextureLoaded,
    AnimationLoaded,
    AssetOptimized,
    AssetEvicted,
    AssetUnloaded,
    AssetAccessed,
    MemoryCleanup,
    MemoryStats,
    PreloadQueued,
    PreloadError,
    LoadError,
    UnloadBlocked,
    Disposed,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    ModelLoaded {
        id: String,
        footprint_mb: f64,
    },
    TextureLoaded {
        id: String,
        footprint_mb: f64,
    },
    AnimationLoaded {
        id: String,
        footprint_mb: f64,
    },
    AssetOptimized {
        id: String,
        memory_saved_mb: f64,
        compression_ratio: f64,
    },
    AssetEvicted {
        id: String,
        freed_mb: f64,
    },
    AssetUnloaded {
        id: String,
        freed_mb: f64,
    },
    AssetAccessed {
        id: String,
        cache_hit: bool,
    },
    MemoryCleanup {
        freed_mb: f64,
        evicted: Vec<String>,
    },
    MemoryStats(MemoryStats),
    PreloadQueued {
        requested: usize,
        queue_size: usize,
    },
    PreloadError {
        id: String,
        error: String,
    },
    LoadError {
        id: String,
        error: String,
    },
    UnloadBlocked {
        id: String,
        ref_count: u32,
    },
    Disposed,
}

impl AssetEvent {
    /// Loaded event matching the asset kind
    pub fn loaded(kind: AssetKind, id: String, footprint_mb: f64) -> Self {
        match kind {
            AssetKind::Model => Self::ModelLoaded { id, footprint_mb },
            AssetKind::Texture => Self::TextureLoaded { id, footprint_mb },
            AssetKind::Animation => Self::AnimationLoaded { id, footprint_mb },
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::ModelLoaded { .. } => EventKind::ModelLoaded,
            Self::TextureLoaded { .. } => EventKind::TextureLoaded,
            Self::AnimationLoaded { .. } => EventKind::AnimationLoaded,
            Self::AssetOptimized { .. } => EventKind::AssetOptimized,
            Self::AssetEvicted { .. } => EventKind::AssetEvicted,
            Self::AssetUnloaded { .. } => EventKind::AssetUnloaded,
            Self::AssetAccessed { .. } => EventKind::AssetAccessed,
            Self::MemoryCleanup { .. } => EventKind::MemoryCleanup,
            Self::MemoryStats(_) => EventKind::MemoryStats,
            Self::PreloadQueued { .. } => EventKind::PreloadQueued,
            Self::PreloadError { .. } => EventKind::PreloadError,
            Self::LoadError { .. } => EventKind::LoadError,
            Self::UnloadBlocked { .. } => EventKind::UnloadBlocked,
            Self::Disposed => EventKind::Disposed,
        }
    }
}

/// Subscriber callback
pub type EventHandler = Arc<dyn Fn(&AssetEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct Subscription {
    id: SubscriptionId,
    filter: Option<EventKind>,
    handler: EventHandler,
}

/// Thread-safe event bus; clones share the same subscriber list
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscription>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a single event tag
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(handler))
    }

    /// Subscribe to every event
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&AssetEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(handler))
    }

    fn insert(&self, filter: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.write().push(Subscription {
            id,
            filter,
            handler,
        });
        id
    }

    /// Remove a subscription, returning whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver `event` to every matching subscriber
    pub fn publish(&self, event: AssetEvent) {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.filter.map_or(true, |f| f == kind))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    /// Detach every subscriber
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_filtered_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe(EventKind::Disposed, move |e| seen_clone.lock().push(e.kind()));

        bus.publish(AssetEvent::LoadError {
            id: "x".into(),
            error: "boom".into(),
        });
        bus.publish(AssetEvent::Disposed);

        assert_eq!(*seen.lock(), vec![EventKind::Disposed]);
    }

    #[test]
    fn test_unsubscribe_and_clear() {
        let bus = EventBus::new();
        let id = bus.subscribe_all(|_| {});
        bus.subscribe_all(|_| {});
        assert_eq!(bus.subscriber_count(), 2);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.clear();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_publish() {
        let bus = EventBus::new();
        let inner = bus.clone();
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        bus.subscribe(EventKind::Disposed, move |_| {
            inner.publish(AssetEvent::PreloadQueued {
                requested: 0,
                queue_size: 0,
            })
        });
        bus.subscribe(EventKind::PreloadQueued, move |_| *count_clone.lock() += 1);

        bus.publish(AssetEvent::Disposed);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_loaded_event_matches_kind() {
        let e = AssetEvent::loaded(AssetKind::Animation, "walk".into(), 1.0);
        assert_eq!(e.kind(), EventKind::AnimationLoaded);
    }
}
