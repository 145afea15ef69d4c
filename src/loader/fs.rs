//! Filesystem backend
//!
//! Resolves ids relative to a root directory: models and animations from
//! `<id>.glb`, textures from `<id>.png`, `<id>.jpg` or `<id>.jpeg`.
//! Footprints are the decoded payload's size estimate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::gltf::{load_glb_animation, load_glb_model};
use super::{AssetBackend, BackendError, BackendResult, LoadedPayload};
use crate::asset::AssetPayload;
use crate::texture::TextureData;
use crate::types::AssetKind;

const TEXTURE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Backend reading assets from a directory tree
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn existing(&self, id: &str, extensions: &[&str], kind: AssetKind) -> BackendResult<PathBuf> {
        extensions
            .iter()
            .map(|ext| self.root.join(format!("{id}.{ext}")))
            .find(|path| path.is_file())
            .ok_or_else(|| BackendError::NotFound {
                id: id.to_string(),
                kind,
            })
    }
}

/// Decode PNG/JPEG bytes into an RGBA8 texture
pub fn decode_texture(data: &[u8]) -> BackendResult<TextureData> {
    let img = image::load_from_memory(data)?;
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TextureData::from_rgba8(width, height, rgba.into_raw()))
}

#[async_trait]
impl AssetBackend for FsBackend {
    async fn load_model(&self, id: &str) -> BackendResult<LoadedPayload> {
        let path = self.existing(id, &["glb"], AssetKind::Model)?;
        let data = tokio::fs::read(&path).await?;
        let model = tokio::task::spawn_blocking(move || load_glb_model(&data))
            .await
            .map_err(anyhow::Error::from)??;
        log::debug!("Loaded model {id} from {}", path.display());
        Ok(LoadedPayload::estimated(AssetPayload::Model(model)))
    }

    async fn load_texture(&self, id: &str) -> BackendResult<LoadedPayload> {
        let path = self.existing(id, &TEXTURE_EXTENSIONS, AssetKind::Texture)?;
        let data = tokio::fs::read(&path).await?;
        let texture = tokio::task::spawn_blocking(move || decode_texture(&data))
            .await
            .map_err(anyhow::Error::from)??;
        log::debug!(
            "Loaded texture {id} ({}x{}) from {}",
            texture.width,
            texture.height,
            path.display()
        );
        Ok(LoadedPayload::estimated(AssetPayload::Texture(texture)))
    }

    async fn load_animation(&self, id: &str) -> BackendResult<LoadedPayload> {
        let path = self.existing(id, &["glb"], AssetKind::Animation)?;
        let data = tokio::fs::read(&path).await?;
        let clip = tokio::task::spawn_blocking(move || load_glb_animation(&data))
            .await
            .map_err(anyhow::Error::from)??;
        Ok(LoadedPayload::estimated(AssetPayload::Animation(clip)))
    }

    fn backend_name(&self) -> &'static str {
        "Filesystem"
    }
}
