//! Pluggable backend loaders
//!
//! The cache never decodes anything itself; it asks an [`AssetBackend`] for
//! a decoded payload and the memory footprint that payload will occupy.

pub mod fs;
pub mod gltf;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::asset::AssetPayload;
use crate::types::AssetKind;

pub use fs::FsBackend;
pub use mock::MockBackend;

/// Error type for backend loaders
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No {kind} named {id}")]
    NotFound { id: String, kind: AssetKind },

    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("GLTF error: {0}")]
    Gltf(#[from] ::gltf::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for backend loaders
pub type BackendResult<T> = Result<T, BackendError>;

/// A decoded payload and its declared footprint
#[derive(Debug, Clone)]
pub struct LoadedPayload {
    pub payload: AssetPayload,
    pub footprint_mb: f64,
}

impl LoadedPayload {
    /// Payload whose footprint is its own size estimate
    pub fn estimated(payload: AssetPayload) -> Self {
        let footprint_mb = payload.estimated_mb();
        Self {
            payload,
            footprint_mb,
        }
    }
}

/// Capability-typed asset loaders
///
/// Retry policy, if any, belongs to the implementation; the cache calls each
/// loader at most once per load.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    async fn load_model(&self, id: &str) -> BackendResult<LoadedPayload>;

    async fn load_texture(&self, id: &str) -> BackendResult<LoadedPayload>;

    async fn load_animation(&self, id: &str) -> BackendResult<LoadedPayload>;

    /// Dispatch to the loader for `kind`
    async fn load_kind(&self, id: &str, kind: AssetKind) -> BackendResult<LoadedPayload> {
        match kind {
            AssetKind::Model => self.load_model(id).await,
            AssetKind::Texture => self.load_texture(id).await,
            AssetKind::Animation => self.load_animation(id).await,
        }
    }

    /// Get the name of this backend (for debugging)
    fn backend_name(&self) -> &'static str;
}
