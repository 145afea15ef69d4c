//! In-memory backend for testing
//!
//! Serves payloads registered up front, counts every loader invocation per
//! id, and can simulate decode latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::{AssetBackend, BackendError, BackendResult, LoadedPayload};
use crate::animation::AnimationData;
use crate::asset::AssetPayload;
use crate::model::ModelData;
use crate::texture::TextureData;
use crate::types::AssetKind;

#[derive(Debug, Default)]
struct MockBackendInner {
    assets: RwLock<HashMap<String, LoadedPayload>>,
    calls: Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
    delay: RwLock<Option<Duration>>,
}

/// Mock backend; clones share the same registry and counters
#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    inner: Arc<MockBackendInner>,
}

impl MockBackend {
    /// Create an empty mock backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every loader call sleep for `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.write() = Some(delay);
        self
    }

    pub fn insert(&self, id: impl Into<String>, payload: AssetPayload, footprint_mb: f64) {
        self.inner.assets.write().insert(
            id.into(),
            LoadedPayload {
                payload,
                footprint_mb,
            },
        );
    }

    pub fn insert_model(&self, id: impl Into<String>, model: ModelData, footprint_mb: f64) {
        self.insert(id, AssetPayload::Model(model), footprint_mb);
    }

    pub fn insert_texture(&self, id: impl Into<String>, texture: TextureData, footprint_mb: f64) {
        self.insert(id, AssetPayload::Texture(texture), footprint_mb);
    }

    pub fn insert_animation(
        &self,
        id: impl Into<String>,
        animation: AnimationData,
        footprint_mb: f64,
    ) {
        self.insert(id, AssetPayload::Animation(animation), footprint_mb);
    }

    pub fn remove(&self, id: &str) -> bool {
        self.inner.assets.write().remove(id).is_some()
    }

    /// Number of loader invocations for `id`, all kinds included
    pub fn call_count(&self, id: &str) -> usize {
        self.inner.calls.lock().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.inner.total_calls.load(Ordering::SeqCst)
    }

    async fn serve(&self, id: &str, kind: AssetKind) -> BackendResult<LoadedPayload> {
        *self.inner.calls.lock().entry(id.to_string()).or_insert(0) += 1;
        self.inner.total_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.inner.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.inner
            .assets
            .read()
            .get(id)
            .filter(|entry| entry.payload.kind() == kind)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                id: id.to_string(),
                kind,
            })
    }
}

#[async_trait]
impl AssetBackend for MockBackend {
    async fn load_model(&self, id: &str) -> BackendResult<LoadedPayload> {
        self.serve(id, AssetKind::Model).await
    }

    async fn load_texture(&self, id: &str) -> BackendResult<LoadedPayload> {
        self.serve(id, AssetKind::Texture).await
    }

    async fn load_animation(&self, id: &str) -> BackendResult<LoadedPayload> {
        self.serve(id, AssetKind::Animation).await
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
