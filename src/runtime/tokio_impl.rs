//! Tokio async runtime implementation

use super::{AsyncSpawner, BoxFuture, JoinHandle};
use futures::FutureExt;
use std::future::Future;

/// Tokio-based async spawner
///
/// Spawns tasks on the ambient Tokio runtime, so it must be used from
/// within one.
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    /// Create a new Tokio spawner
    pub fn new() -> Self {
        Self
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        JoinHandle::new(tokio::spawn(task))
    }

    fn spawn_blocking<F, T>(&self, work: F) -> BoxFuture<'static, Option<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(work);
        async move {
            match handle.await {
                Ok(value) => Some(value),
                Err(err) => {
                    log::error!("Blocking task failed: {err}");
                    None
                }
            }
        }
        .boxed()
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tokio_spawner() {
        let spawner = TokioSpawner::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        let handle = spawner.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });

        let inner = handle.downcast::<tokio::task::JoinHandle<()>>();
        assert!(inner.is_some());
        if let Some(inner) = inner {
            inner.await.unwrap();
        }
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tokio_spawn_blocking() {
        let spawner = TokioSpawner::new();
        let result = spawner.spawn_blocking(|| 6 * 7).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_tokio_spawn_blocking_panic() {
        let spawner = TokioSpawner::new();
        let result: Option<u32> = spawner.spawn_blocking(|| panic!("boom")).await;
        assert!(result.is_none());
    }

    #[test]
    fn test_tokio_runtime_name() {
        let spawner = TokioSpawner::new();
        assert_eq!(spawner.runtime_name(), "Tokio");
    }
}
