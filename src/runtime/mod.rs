//! Async runtime abstraction for background work
//!
//! The store and the optimizer never call a runtime directly: preload
//! draining, memory monitoring, the optimization worker and CPU-heavy
//! transforms all go through an [`AsyncSpawner`].

pub mod mock;
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;

pub use futures::future::BoxFuture;

/// Handle to a spawned async task
///
/// This is a type-erased handle that allows recovering the runtime's own
/// handle type.
#[derive(Debug)]
pub struct JoinHandle {
    inner: Box<dyn std::any::Any + Send>,
}

impl JoinHandle {
    /// Create a new join handle
    pub fn new<T: Send + 'static>(handle: T) -> Self {
        Self {
            inner: Box::new(handle),
        }
    }

    /// Try to downcast to a specific handle type
    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.inner.downcast::<T>().ok().map(|b| *b)
    }
}

/// Async task spawner trait
///
/// # Example
/// ```ignore
/// let spawner = TokioSpawner::new();
/// spawner.spawn(async {
///     // Async work here
/// });
/// ```
pub trait AsyncSpawner: Send + Sync + Clone + Debug + 'static {
    /// Spawn a background task
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Run CPU-bound work off the async executor.
    ///
    /// Resolves to `None` if the work panicked or was cancelled.
    fn spawn_blocking<F, T>(&self, work: F) -> BoxFuture<'static, Option<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

pub use mock::MockSpawner;
pub use tokio_impl::TokioSpawner;
